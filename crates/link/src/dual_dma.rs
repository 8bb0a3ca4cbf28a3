//! Dual-DMA register programming shared by the transmit and receive engines.

use platform::dma_safety::{DmaAccessible, RamxRegion, RX_LEN_MAX_ENCODING};
use platform::hspi::{
    AUX_ACK_CNT_SEL, AUX_ACK_TX_MOD, AUX_REQ_FT, AUX_TCK_MOD, CFG_DAT_MASK, CFG_DUALDMA, CFG_HW_ACK,
    CFG_MODE_HOST, CFG_RX_TOG_EN, CFG_TX_TOG_EN, CTRL_ALL_CLR, CTRL_DMA_EN, CTRL_ENABLE,
    CTRL_TRX_RST, INT_FIFO_OV, INT_R_DONE, INT_T_DONE, REG_AUX, REG_BURST_CFG, REG_CFG,
    REG_CTRL, REG_DMA_LEN0, REG_DMA_LEN1, REG_INT_EN, REG_RX_ADDR0, REG_RX_ADDR1, REG_RX_LEN0,
    REG_RX_LEN1, REG_RX_SC, REG_TX_ADDR0, REG_TX_ADDR1, REG_TX_SC, REG_UDF0, REG_UDF1, SC_TOG,
};
use platform::{HspiPort, LinkBufferPair, Selector};

use crate::burst::PacketBurst;
use crate::config::HspiConfig;
use crate::error::LinkError;

/// HSPI side of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Host,
    Device,
}

/// Both halves must be word aligned and every packet must land in RAMX.
pub(crate) fn check_buffers(pair: &LinkBufferPair, burst: &PacketBurst) -> Result<(), LinkError> {
    if !pair.is_word_aligned() {
        return Err(LinkError::InvalidBuffer);
    }
    for sel in [Selector::Zero, Selector::One] {
        let span = burst.span_of(sel);
        if span != 0 && !RamxRegion::contains(pair.address(sel), span) {
            return Err(LinkError::InvalidBuffer);
        }
    }
    Ok(())
}

/// Full HSPI init for one side of the link, ending with the interface and
/// its DMA enabled. The hardware toggle and sequence number are not reset.
pub(crate) fn init<P: HspiPort>(port: &mut P, mode: Mode, cfg: &HspiConfig, pair: &LinkBufferPair) {
    // Release the reset bits without pulsing them: the packet sequence
    // number must stay in step with the peer, which keeps counting.
    port.clear_bits8(REG_CTRL, CTRL_ENABLE | CTRL_DMA_EN | CTRL_ALL_CLR | CTRL_TRX_RST);

    let mut cfg_bits = port.read8(REG_CFG)
        & !(CFG_MODE_HOST | CFG_DAT_MASK | CFG_HW_ACK | CFG_TX_TOG_EN | CFG_RX_TOG_EN);
    cfg_bits |= cfg.width.cfg_bits() | CFG_DUALDMA;
    cfg_bits |= match mode {
        Mode::Host => CFG_MODE_HOST | CFG_TX_TOG_EN,
        Mode::Device => CFG_RX_TOG_EN,
    };
    port.write8(REG_CFG, cfg_bits);

    port.set_bits8(REG_AUX, AUX_REQ_FT | AUX_TCK_MOD);
    port.clear_bits8(REG_AUX, AUX_ACK_TX_MOD | AUX_ACK_CNT_SEL);

    let done = match mode {
        Mode::Host => INT_T_DONE,
        Mode::Device => INT_R_DONE,
    };
    port.write8(REG_INT_EN, done | INT_FIFO_OV);

    port.write32(REG_UDF0, cfg.udf0);
    port.write32(REG_UDF1, cfg.udf1);

    port.write32(REG_TX_ADDR0, pair.address(Selector::Zero));
    port.write32(REG_TX_ADDR1, pair.address(Selector::One));
    port.write32(REG_RX_ADDR0, pair.address(Selector::Zero));
    port.write32(REG_RX_ADDR1, pair.address(Selector::One));

    let len = cfg.burst.packet_len().saturating_sub(1);
    port.write16(REG_DMA_LEN0, len);
    port.write16(REG_DMA_LEN1, len);
    port.write16(REG_RX_LEN0, RX_LEN_MAX_ENCODING);
    port.write16(REG_RX_LEN1, RX_LEN_MAX_ENCODING);
    port.write16(REG_BURST_CFG, 0);

    port.set_bits8(REG_CTRL, CTRL_ENABLE | CTRL_DMA_EN);
    port.enable_irq();
}

/// One direction's address registers and the buffer pair behind them.
///
/// The hardware picks ADDR0 or ADDR1 from its own toggle bit, which is not
/// reset between bursts. `phase` records the toggle at burst start so that
/// logical half 0 (the first packet) is always programmed into the register
/// the hardware uses next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DmaChannel {
    addr_regs: [u8; 2],
    sc_reg: u8,
    pair: LinkBufferPair,
    burst: PacketBurst,
    phase: Selector,
}

impl DmaChannel {
    pub(crate) const fn transmit(pair: LinkBufferPair, burst: PacketBurst) -> Self {
        Self {
            addr_regs: [REG_TX_ADDR0, REG_TX_ADDR1],
            sc_reg: REG_TX_SC,
            pair,
            burst,
            phase: Selector::Zero,
        }
    }

    pub(crate) const fn receive(pair: LinkBufferPair, burst: PacketBurst) -> Self {
        Self {
            addr_regs: [REG_RX_ADDR0, REG_RX_ADDR1],
            sc_reg: REG_RX_SC,
            pair,
            burst,
            phase: Selector::Zero,
        }
    }

    pub(crate) const fn pair(&self) -> LinkBufferPair {
        self.pair
    }

    pub(crate) const fn burst(&self) -> PacketBurst {
        self.burst
    }

    pub(crate) const fn phase(&self) -> Selector {
        self.phase
    }

    const fn reg(&self, physical: Selector) -> u8 {
        let [r0, r1] = self.addr_regs;
        match physical {
            Selector::Zero => r0,
            Selector::One => r1,
        }
    }

    /// Register half used for logical half `logical`.
    pub(crate) const fn physical(&self, logical: Selector) -> Selector {
        match self.phase {
            Selector::Zero => logical,
            Selector::One => logical.toggled(),
        }
    }

    /// Toggle bit currently reported by the hardware.
    pub(crate) fn hardware_toggle<P: HspiPort>(&self, port: &P) -> Selector {
        Selector::from_bit(port.read8(self.sc_reg) & SC_TOG != 0)
    }

    /// Latch the hardware toggle and program both burst-start addresses.
    pub(crate) fn rearm<P: HspiPort>(&mut self, port: &mut P) {
        self.phase = self.hardware_toggle(port);
        for logical in [Selector::Zero, Selector::One] {
            port.write32(self.reg(self.physical(logical)), self.pair.address(logical));
        }
    }

    /// Move the register of logical half `used` to its next packet.
    pub(crate) fn advance<P: HspiPort>(&self, port: &mut P, used: Selector) {
        let reg = self.reg(self.physical(used));
        let next = port.read32(reg).wrapping_add(self.burst.stride());
        port.write32(reg, next);
    }
}
