//! Double-buffer DMA receive engine (HSPI device side).

use platform::hspi::{REG_RTX_STATUS, STATUS_CRC_ERR, STATUS_NUM_MIS};
use platform::{HspiPort, LinkBufferPair, Selector};

use crate::burst::PacketBurst;
use crate::config::HspiConfig;
use crate::dual_dma::{self, DmaChannel, Mode};
use crate::error::{LinkError, LinkErrors};

/// Receive side of a configured buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEngine {
    channel: DmaChannel,
}

impl RxEngine {
    /// Engine over `pair`; both halves must hold their share of `burst` in RAMX.
    pub fn new(pair: LinkBufferPair, burst: PacketBurst) -> Result<Self, LinkError> {
        dual_dma::check_buffers(&pair, &burst)?;
        Ok(Self {
            channel: DmaChannel::receive(pair, burst),
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

    /// Program the HSPI as device; reception is continuous from here on.
    pub fn configure<P: HspiPort>(&mut self, port: &mut P, cfg: &HspiConfig) {
        let cfg = cfg.with_burst(self.burst());
        dual_dma::init(port, Mode::Device, &cfg, &self.pair());
        self.channel.rearm(port);
    }

    /// Restore both address registers to the burst start.
    pub fn reinit<P: HspiPort>(&mut self, port: &mut P) {
        self.channel.rearm(port);
    }

    /// Move logical half `used` to its next packet.
    pub fn advance<P: HspiPort>(&self, port: &mut P, used: Selector) {
        self.channel.advance(port, used);
    }

    /// Faults the hardware reported for the last packet.
    pub fn packet_errors<P: HspiPort>(&self, port: &P) -> LinkErrors {
        let status = port.read8(REG_RTX_STATUS);
        let mut errors = LinkErrors::NONE;
        if status & STATUS_CRC_ERR != 0 {
            errors |= LinkErrors::CRC;
        }
        if status & STATUS_NUM_MIS != 0 {
            errors |= LinkErrors::SEQ;
        }
        errors
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
    use platform::hspi::{REG_RX_ADDR0, REG_RX_ADDR1};
    use platform::mocks::SimHspi;

    fn engine() -> RxEngine {
        RxEngine::new(LinkBufferPair::interleaved(RAMX_BASE, 512), PacketBurst::DEFAULT).unwrap()
    }

    #[test]
    fn packet_errors_decode_both_flags() {
        let (_host, dev) = SimHspi::pair();
        let rx = engine();
        dev.set_rtx_status(STATUS_CRC_ERR | STATUS_NUM_MIS);
        assert_eq!(rx.packet_errors(&dev), LinkErrors::CRC | LinkErrors::SEQ);
        dev.set_rtx_status(0);
        assert!(rx.packet_errors(&dev).is_empty());
    }

    #[test]
    fn reinit_restores_burst_start() {
        let (_host, mut dev) = SimHspi::pair();
        let mut rx = engine();
        rx.configure(&mut dev, &HspiConfig::default());
        rx.advance(&mut dev, Selector::Zero);
        assert_eq!(dev.read32(REG_RX_ADDR0), RAMX_BASE + 1024);
        rx.reinit(&mut dev);
        assert_eq!(dev.read32(REG_RX_ADDR0), RAMX_BASE);
        assert_eq!(dev.read32(REG_RX_ADDR1), RAMX_BASE + 512);
    }
}
