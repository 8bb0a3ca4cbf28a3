//! Double-buffer DMA transmit engine (HSPI host side).
//!
//! The engine programs the hardware and starts the first packet of a burst.
//! Re-triggering the remaining packets is the sequencer's job.

use platform::hspi::{CTRL_SW_ACT, REG_CTRL};
use platform::{HspiPort, LinkBufferPair, Selector};

use crate::burst::PacketBurst;
use crate::config::HspiConfig;
use crate::dual_dma::{self, DmaChannel, Mode};
use crate::error::LinkError;

/// Transmit side of a configured buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxEngine {
    channel: DmaChannel,
}

impl TxEngine {
    /// Engine over `pair`; both halves must hold their share of `burst` in RAMX.
    pub fn new(pair: LinkBufferPair, burst: PacketBurst) -> Result<Self, LinkError> {
        dual_dma::check_buffers(&pair, &burst)?;
        Ok(Self {
            channel: DmaChannel::transmit(pair, burst),
        })
    }

    /// Registered buffer pair.
    pub const fn pair(&self) -> LinkBufferPair {
        self.channel.pair()
    }

    /// Registered burst shape.
    pub const fn burst(&self) -> PacketBurst {
        self.channel.burst()
    }

    /// Program the HSPI as host with this engine's pair and burst.
    pub fn configure<P: HspiPort>(&mut self, port: &mut P, cfg: &HspiConfig) {
        let cfg = cfg.with_burst(self.burst());
        dual_dma::init(port, Mode::Host, &cfg, &self.pair());
        self.channel.rearm(port);
    }

    /// Point both address registers at the burst start.
    pub fn rearm<P: HspiPort>(&mut self, port: &mut P) {
        self.channel.rearm(port);
    }

    /// Software trigger: send one packet from the register the hardware
    /// toggle selects.
    pub fn trigger<P: HspiPort>(&self, port: &mut P) {
        port.set_bits8(REG_CTRL, CTRL_SW_ACT);
    }

    /// Move logical half `used` to its next packet.
    pub fn advance<P: HspiPort>(&self, port: &mut P, used: Selector) {
        self.channel.advance(port, used);
    }

    /// Register half used for logical half `logical` in the current burst.
    pub const fn physical(&self, logical: Selector) -> Selector {
        self.channel.physical(logical)
    }

    /// Toggle bit the hardware currently reports.
    pub fn hardware_toggle<P: HspiPort>(&self, port: &P) -> Selector {
        self.channel.hardware_toggle(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::dma_safety::RAMX_BASE;
    use platform::hspi::{REG_TX_ADDR0, REG_TX_ADDR1};
    use platform::mocks::SimHspi;

    #[test]
    fn trigger_sends_from_half_zero_first() {
        let (mut host, _dev) = SimHspi::pair();
        let mut tx = TxEngine::new(LinkBufferPair::interleaved(RAMX_BASE, 512), PacketBurst::DEFAULT).unwrap();
        tx.configure(&mut host, &HspiConfig::default());
        tx.trigger(&mut host);
        assert_eq!(host.sent(), std::vec![(Selector::Zero, RAMX_BASE)]);
        assert_eq!(host.wire().borrow().in_flight(1), 1);
        assert_eq!(tx.hardware_toggle(&host), Selector::One);
    }

    #[test]
    fn advance_moves_by_two_packets() {
        let (mut host, _dev) = SimHspi::pair();
        let mut tx = TxEngine::new(LinkBufferPair::interleaved(RAMX_BASE, 512), PacketBurst::DEFAULT).unwrap();
        tx.configure(&mut host, &HspiConfig::default());
        tx.advance(&mut host, Selector::Zero);
        tx.advance(&mut host, Selector::One);
        assert_eq!(host.read32(REG_TX_ADDR0), RAMX_BASE + 1024);
        assert_eq!(host.read32(REG_TX_ADDR1), RAMX_BASE + 512 + 1024);
        tx.rearm(&mut host);
        assert_eq!(host.read32(REG_TX_ADDR0), RAMX_BASE);
    }

    #[test]
    fn rejects_buffers_outside_ramx() {
        let pair = LinkBufferPair::new(0x2000_0000, 0x2000_0200);
        assert_eq!(TxEngine::new(pair, PacketBurst::DEFAULT), Err(LinkError::InvalidBuffer));
    }
}
