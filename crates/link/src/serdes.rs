//! SerDes variant of the link.
//!
//! Same protocol shape as HSPI with a simpler engine: the transmitter sends
//! one buffer per trigger with an explicit length and a 28-bit custom number,
//! the receiver lands packets in one buffer or alternates between two
//! (BUF_MODE). The interrupt handler records per-buffer status and counts
//! receive errors and FIFO overflows.

use embedded_hal::delay::DelayNs;
use platform::dma_safety::{DmaAccessible, RamxRegion, MAX_DMA_LEN};
use platform::serdes::{
    CTRL_ALIGN_EN, CTRL_ALL_CLR, CTRL_CONT_EN, CTRL_DMA_EN, CTRL_INT_BUSY_EN, CTRL_LINK_RESET,
    CTRL_PHY_RESET, CTRL_POWER_BITS, CTRL_RX_EN, CTRL_TX_EN, CUSTOM_NUMBER_MAX, INT_ALL, INT_COMMA,
    INT_FIFO_OV, INT_RX_DONE, INT_RX_ERR, INT_TX_DONE, REG_CTRL, REG_DATA0, REG_DATA1,
    REG_DMA0, REG_DMA1, REG_INT_EN, REG_RTX_CTRL, REG_RX_LEN0, REG_RX_LEN1, REG_STATUS,
    RTX_BUF_MODE, RTX_LINK_INIT, RTX_TX_START, STATUS_PLL_READY, STATUS_RX_CRC_OK, STATUS_TX_READY,
};
use platform::{PllFreq, SerdesPort, Timebase};

use crate::config::SerdesConfig;
use crate::error::LinkError;

/// Which end of the SerDes link this board is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerdesRole {
    /// Sends packets
    Transmitter,
    /// Receives packets
    Receiver,
}

/// 28-bit value sent ahead of the payload (DATA0 register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CustomNumber(u32);

impl CustomNumber {
    /// Largest representable value.
    pub const MAX: Self = Self(CUSTOM_NUMBER_MAX);

    /// Rejects values of 2^28 and above.
    pub const fn try_new(value: u32) -> Result<Self, LinkError> {
        if value > CUSTOM_NUMBER_MAX {
            Err(LinkError::CustomNumberTooWide)
        } else {
            Ok(Self(value))
        }
    }

    /// Raw value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// What the receive interrupt recorded for one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxSlot {
    /// STATUS register at interrupt time
    pub status: u32,
    /// Bytes received
    pub len: u32,
    /// Hardware CRC check passed
    pub crc_ok: bool,
    /// Custom number received with the packet
    pub custom: u32,
    /// Timebase cycles at interrupt time
    pub at_cycles: u64,
}

/// Flags handled by one [`SerdesLink::on_interrupt`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerdesIrq {
    /// A packet was received
    pub rx_done: bool,
    /// A receive error was counted
    pub rx_err: bool,
    /// A FIFO overflow was counted
    pub fifo_overflow: bool,
}

/// One board's side of the SerDes link.
pub struct SerdesLink<P: SerdesPort, D: DelayNs> {
    port: P,
    delay: D,
    config: SerdesConfig,
    role: Option<SerdesRole>,
    double: bool,
    slots: [Option<RxSlot>; 2],
    received: u32,
    rx_errors: u32,
    fifo_overflows: u32,
}

impl<P: SerdesPort, D: DelayNs> SerdesLink<P, D> {
    /// Powered-down link.
    pub fn new(port: P, delay: D, config: SerdesConfig) -> Self {
        Self {
            port,
            delay,
            config,
            role: None,
            double: false,
            slots: [None; 2],
            received: 0,
            rx_errors: 0,
            fifo_overflows: 0,
        }
    }

    /// Reset PHY, link and DMA, power up at `freq` and wait for the PLL.
    ///
    /// A transmitter also runs link init and waits for TX_READY.
    pub fn power_up(&mut self, role: SerdesRole, freq: PllFreq) -> Result<(), LinkError> {
        self.config.validate()?;
        self.role = None;
        self.port.analog_setup();

        self.port
            .write(REG_CTRL, CTRL_PHY_RESET | CTRL_LINK_RESET | CTRL_ALL_CLR);
        self.delay.delay_us(1);
        let powered = CTRL_POWER_BITS | freq.ctrl_bits();
        self.port
            .write(REG_CTRL, powered | CTRL_LINK_RESET | CTRL_ALL_CLR);
        if !self.wait_status(STATUS_PLL_READY, self.config.pll_budget) {
            warn!("serdes pll lock timeout at {} MHz", freq.line_rate_mhz());
            return Err(LinkError::PllTimeout);
        }
        self.delay.delay_us(1);

        match role {
            SerdesRole::Transmitter => {
                self.port.write(
                    REG_CTRL,
                    powered | CTRL_INT_BUSY_EN | CTRL_DMA_EN | CTRL_TX_EN | CTRL_ALIGN_EN | CTRL_CONT_EN,
                );
                self.port.write(REG_RTX_CTRL, RTX_LINK_INIT);
                self.delay.delay_us(1);
                self.port.write(REG_RTX_CTRL, 0);
                if !self.wait_status(STATUS_TX_READY, self.config.tx_ready_budget) {
                    return Err(LinkError::TxReadyTimeout);
                }
            }
            SerdesRole::Receiver => {
                self.port
                    .write(REG_CTRL, powered | CTRL_DMA_EN | CTRL_RX_EN);
            }
        }
        self.role = Some(role);
        info!("serdes up at {} MHz", freq.line_rate_mhz());
        Ok(())
    }

    fn wait_status(&self, mask: u32, budget: u32) -> bool {
        (0..budget).any(|_| self.port.read(REG_STATUS) & mask != 0)
    }

    fn require(&self, role: SerdesRole) -> Result<(), LinkError> {
        if self.role == Some(role) {
            Ok(())
        } else {
            Err(LinkError::NotConfigured)
        }
    }

    fn check_buffer(addr: u32, len: u32) -> Result<(), LinkError> {
        if addr % 4 != 0 || !RamxRegion::contains(addr, len) {
            return Err(LinkError::InvalidBuffer);
        }
        Ok(())
    }

    // ── Transmit ─────────────────────────────────────────────────────────────

    /// Register the buffer at `addr`, its length and the custom number.
    pub fn configure_tx(&mut self, addr: u32, len: u16, custom: CustomNumber) -> Result<(), LinkError> {
        self.require(SerdesRole::Transmitter)?;
        if len == 0 || len > MAX_DMA_LEN {
            return Err(LinkError::InvalidPacketLength);
        }
        Self::check_buffer(addr, u32::from(len))?;
        if !self.wait_status(STATUS_TX_READY, self.config.tx_ready_budget) {
            return Err(LinkError::TxReadyTimeout);
        }
        self.port.write(REG_DMA0, addr);
        self.port.write(REG_RTX_CTRL, u32::from(len));
        self.port.write(REG_DATA0, custom.get());
        Ok(())
    }

    /// Start sending the configured buffer.
    pub fn send(&mut self) -> Result<(), LinkError> {
        self.require(SerdesRole::Transmitter)?;
        if !self.wait_status(STATUS_TX_READY, self.config.tx_ready_budget) {
            return Err(LinkError::TxReadyTimeout);
        }
        self.port.set_bits(REG_RTX_CTRL, RTX_TX_START);
        Ok(())
    }

    /// Wait for the transmit-done flag, release TX_START and clear the flag.
    pub fn wait_tx_done(&mut self) -> Result<(), LinkError> {
        if !self.wait_status(INT_TX_DONE, self.config.tx_ready_budget) {
            return Err(LinkError::TxReadyTimeout);
        }
        self.port.clear_bits(REG_RTX_CTRL, RTX_TX_START);
        let budget = self.config.tx_ready_budget;
        if !(0..budget).any(|_| self.port.read(REG_RTX_CTRL) & RTX_TX_START == 0) {
            return Err(LinkError::TxReadyTimeout);
        }
        self.port.write(REG_STATUS, INT_TX_DONE);
        Ok(())
    }

    /// Send the configured buffer once and wait until it is out.
    pub fn send_blocking(&mut self) -> Result<(), LinkError> {
        self.send()?;
        self.wait_tx_done()
    }

    // ── Receive ──────────────────────────────────────────────────────────────

    fn arm_rx(&mut self) {
        self.slots = [None; 2];
        self.received = 0;
        self.rx_errors = 0;
        self.fifo_overflows = 0;
        self.port
            .write(REG_INT_EN, INT_RX_DONE | INT_RX_ERR | INT_FIFO_OV);
        self.port.write(REG_STATUS, INT_ALL);
        self.port.enable_irq();
    }

    /// Alternate received packets between `addr0` and `addr1` (4 KiB each).
    pub fn configure_rx_double(&mut self, addr0: u32, addr1: u32) -> Result<(), LinkError> {
        self.require(SerdesRole::Receiver)?;
        Self::check_buffer(addr0, u32::from(MAX_DMA_LEN))?;
        Self::check_buffer(addr1, u32::from(MAX_DMA_LEN))?;
        self.port.write(REG_DMA0, addr0);
        self.port.write(REG_DMA1, addr1);
        self.port.write(REG_RTX_CTRL, RTX_BUF_MODE);
        self.double = true;
        self.arm_rx();
        Ok(())
    }

    /// Land every received packet at `addr` (4 KiB).
    pub fn configure_rx_single(&mut self, addr: u32) -> Result<(), LinkError> {
        self.require(SerdesRole::Receiver)?;
        Self::check_buffer(addr, u32::from(MAX_DMA_LEN))?;
        self.port.write(REG_DMA0, addr);
        self.port.write(REG_RTX_CTRL, 0);
        self.double = false;
        self.arm_rx();
        Ok(())
    }

    /// Interrupt handler body.
    ///
    /// Only meaningful on a receiver: the receive error flag shares its bit
    /// with transmit done.
    pub fn on_interrupt<T: Timebase>(&mut self, timebase: &T) -> SerdesIrq {
        let mut irq = SerdesIrq::default();
        if self.role != Some(SerdesRole::Receiver) {
            return irq;
        }
        let status = self.port.read(REG_STATUS);

        if status & INT_RX_DONE != 0 {
            irq.rx_done = true;
            let k = self.received;
            let second = self.double && k % 2 == 1;
            let (len_reg, data_reg) = if second {
                (REG_RX_LEN1, REG_DATA1)
            } else {
                (REG_RX_LEN0, REG_DATA0)
            };
            let slot = RxSlot {
                status,
                len: self.port.read(len_reg),
                crc_ok: status & STATUS_RX_CRC_OK != 0,
                custom: self.port.read(data_reg) & CUSTOM_NUMBER_MAX,
                at_cycles: timebase.now_cycles(),
            };
            if let Some(s) = usize::try_from(k).ok().and_then(|i| self.slots.get_mut(i)) {
                *s = Some(slot);
            }
            self.received = k.saturating_add(1);
            self.port.write(REG_STATUS, INT_RX_DONE | INT_COMMA);
        }
        if status & INT_RX_ERR != 0 {
            irq.rx_err = true;
            self.rx_errors = self.rx_errors.saturating_add(1);
            self.port.write(REG_STATUS, INT_RX_ERR);
        }
        if status & INT_FIFO_OV != 0 {
            irq.fifo_overflow = true;
            self.fifo_overflows = self.fifo_overflows.saturating_add(1);
            self.port.write(REG_STATUS, INT_FIFO_OV);
        }
        irq
    }

    /// Both recorded buffers, once two packets arrived. Restarts recording.
    pub fn take_pair(&mut self) -> Option<[RxSlot; 2]> {
        let [Some(a), Some(b)] = self.slots else {
            return None;
        };
        self.slots = [None; 2];
        self.received = 0;
        Some([a, b])
    }

    /// First recorded buffer. Restarts recording.
    pub fn take_slot(&mut self) -> Option<RxSlot> {
        let [first, _] = self.slots;
        let slot = first?;
        self.slots = [None; 2];
        self.received = 0;
        Some(slot)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Role set by the last successful [`power_up`](Self::power_up).
    pub fn role(&self) -> Option<SerdesRole> {
        self.role
    }

    /// Packets received since the last take.
    pub fn received_count(&self) -> u32 {
        self.received
    }

    /// Receive errors since the receiver was configured.
    pub fn rx_error_count(&self) -> u32 {
        self.rx_errors
    }

    /// FIFO overflows since the receiver was configured.
    pub fn fifo_overflow_count(&self) -> u32 {
        self.fifo_overflows
    }

    /// Underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::SimSerdes;

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn custom_number_is_28_bits() {
        assert!(CustomNumber::try_new(0x0FFF_FFFF).is_ok());
        assert_eq!(CustomNumber::try_new(0x1000_0000), Err(LinkError::CustomNumberTooWide));
    }

    #[test]
    fn power_up_programs_analog_and_locks() {
        let (a, _b) = SimSerdes::pair();
        let handle = a.clone();
        let mut link = SerdesLink::new(a, NoDelay, SerdesConfig::default());
        link.power_up(SerdesRole::Transmitter, PllFreq::G1_20).unwrap();
        assert!(handle.analog_configured());
        assert_eq!(link.role(), Some(SerdesRole::Transmitter));
        assert_ne!(link.port().read(REG_STATUS) & STATUS_TX_READY, 0);
    }

    #[test]
    fn pll_timeout_is_reported() {
        let (a, _b) = SimSerdes::pair();
        a.pll_never_locks();
        let cfg = SerdesConfig {
            pll_budget: 50,
            ..SerdesConfig::default()
        };
        let mut link = SerdesLink::new(a, NoDelay, cfg);
        assert_eq!(link.power_up(SerdesRole::Receiver, PllFreq::G1_20), Err(LinkError::PllTimeout));
        assert_eq!(link.role(), None);
    }

    #[test]
    fn transmit_requires_transmitter_role() {
        let (a, _b) = SimSerdes::pair();
        let mut link = SerdesLink::new(a, NoDelay, SerdesConfig::default());
        assert_eq!(
            link.configure_tx(0x2002_0000, 4, CustomNumber::MAX),
            Err(LinkError::NotConfigured)
        );
        link.power_up(SerdesRole::Receiver, PllFreq::G1_20).unwrap();
        assert_eq!(link.send(), Err(LinkError::NotConfigured));
    }
}
