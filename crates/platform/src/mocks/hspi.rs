//! Wire-level HSPI simulation.
//!
//! Two [`SimHspi`] handles share a [`SimWire`]. A software trigger on the host
//! side DMA-reads one packet from its memory, stamps it with the transmit
//! sequence number and a CRC32, and queues it on the wire. [`SimHspi::pump`]
//! on the device side delivers one queued packet into the receive buffer the
//! hardware toggle selects, raising the same flags the CH569 raises.

use super::SimMemory;
use crate::dma::{BusFault, BusMemory, Selector};
use crate::dma_safety::MAX_DMA_LEN;
use crate::hspi::{
    CFG_MODE_HOST, CFG_RX_TOG_EN, CFG_TX_TOG_EN, CTRL_ALL_CLR, CTRL_DMA_EN, CTRL_ENABLE,
    CTRL_SW_ACT, CTRL_TRX_RST, HspiPort, INT_FIFO_OV, INT_R_DONE, INT_T_DONE, REG_CFG, REG_CTRL,
    REG_DMA_LEN0, REG_DMA_LEN1, REG_INT_EN, REG_INT_FLAG, REG_RTX_STATUS, REG_RX_ADDR0,
    REG_RX_ADDR1, REG_RX_LEN0, REG_RX_LEN1, REG_RX_SC, REG_TX_ADDR0, REG_TX_ADDR1, REG_TX_SC,
    SC_NUM_MASK, SC_TOG, STATUS_CRC_ERR, STATUS_NUM_MIS,
};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

/// One packet in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimFrame {
    /// Transmit sequence number (4 bits)
    pub seq: u8,
    /// Packet payload
    pub payload: Vec<u8>,
    /// CRC32 computed by the sender before any corruption
    pub crc: u32,
    /// Receiver reports a FIFO overflow with this packet
    pub fifo_overflow: bool,
}

/// Shared medium between two simulated boards, with fault injection.
///
/// Faults are keyed by packet number `k`, counting every packet put on the
/// wire from 1.
#[derive(Default)]
pub struct SimWire {
    queues: [VecDeque<SimFrame>; 2],
    sent: u32,
    corrupt: Vec<u32>,
    dropped: Vec<u32>,
    overflow: Vec<u32>,
    bus_faults: Vec<BusFault>,
}

impl SimWire {
    /// Flip one payload bit of packet `k` after its CRC was computed.
    pub fn corrupt_packet(&mut self, k: u32) {
        self.corrupt.push(k);
    }

    /// Lose packet `k` on the wire.
    pub fn drop_packet(&mut self, k: u32) {
        self.dropped.push(k);
    }

    /// Report a receive FIFO overflow together with packet `k`.
    pub fn overflow_on_packet(&mut self, k: u32) {
        self.overflow.push(k);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&mut self) {
        self.corrupt.clear();
        self.dropped.clear();
        self.overflow.clear();
    }

    /// Packets put on the wire so far.
    pub fn packets_sent(&self) -> u32 {
        self.sent
    }

    /// DMA accesses either board made outside its memory.
    pub fn bus_faults(&self) -> &[BusFault] {
        &self.bus_faults
    }

    /// Packets waiting for delivery toward `side`.
    pub fn in_flight(&self, side: usize) -> usize {
        self.queues.get(side).map_or(0, VecDeque::len)
    }

    fn push(&mut self, to: usize, mut frame: SimFrame) {
        self.sent += 1;
        let k = self.sent;
        if self.dropped.contains(&k) {
            return;
        }
        if self.corrupt.contains(&k) {
            if let Some(b) = frame.payload.first_mut() {
                *b ^= 0x01;
            }
        }
        frame.fifo_overflow = self.overflow.contains(&k);
        if let Some(q) = self.queues.get_mut(to) {
            q.push_back(frame);
        }
    }

    fn pop(&mut self, to: usize) -> Option<SimFrame> {
        self.queues.get_mut(to).and_then(VecDeque::pop_front)
    }
}

struct State {
    regs: [u8; 0x30],
    side: usize,
    memory: Rc<RefCell<SimMemory>>,
    wire: Rc<RefCell<SimWire>>,
    tx_tog: bool,
    tx_num: u8,
    rx_tog: bool,
    rx_num: u8,
    rtx_status: u8,
    irq_enabled: bool,
    sent: Vec<(Selector, u32)>,
    received: Vec<(Selector, u32)>,
}

impl State {
    fn r8(&self, offset: u8) -> u8 {
        match offset {
            REG_RTX_STATUS => self.rtx_status,
            REG_TX_SC => (self.tx_num & SC_NUM_MASK) | if self.tx_tog { SC_TOG } else { 0 },
            REG_RX_SC => (self.rx_num & SC_NUM_MASK) | if self.rx_tog { SC_TOG } else { 0 },
            _ => self.regs.get(usize::from(offset)).copied().unwrap_or(0),
        }
    }

    fn r16(&self, offset: u8) -> u16 {
        u16::from_le_bytes([self.r8(offset), self.r8(offset + 1)])
    }

    fn r32(&self, offset: u8) -> u32 {
        u32::from_le_bytes([
            self.r8(offset),
            self.r8(offset + 1),
            self.r8(offset + 2),
            self.r8(offset + 3),
        ])
    }

    fn store(&mut self, offset: u8, bytes: &[u8]) {
        let start = usize::from(offset);
        if let Some(dst) = self.regs.get_mut(start..start + bytes.len()) {
            dst.copy_from_slice(bytes);
        }
    }

    fn enabled(&self) -> bool {
        let ctrl = self.r8(REG_CTRL);
        ctrl & (CTRL_ENABLE | CTRL_DMA_EN) == (CTRL_ENABLE | CTRL_DMA_EN)
    }

    fn is_host(&self) -> bool {
        self.r8(REG_CFG) & CFG_MODE_HOST != 0
    }

    fn raise(&mut self, flags: u8) {
        self.regs[usize::from(REG_INT_FLAG)] |= flags;
    }

    fn reset_logic(&mut self) {
        self.tx_tog = false;
        self.tx_num = 0;
        self.rx_tog = false;
        self.rx_num = 0;
        self.rtx_status = 0;
    }

    fn transmit(&mut self) {
        if !self.enabled() || !self.is_host() {
            return;
        }
        let sel = Selector::from_bit(self.tx_tog);
        let (addr_reg, len_reg) = match sel {
            Selector::Zero => (REG_TX_ADDR0, REG_DMA_LEN0),
            Selector::One => (REG_TX_ADDR1, REG_DMA_LEN1),
        };
        let addr = self.r32(addr_reg);
        let len = usize::from(self.r16(len_reg)) + 1;
        let mut payload = std::vec![0u8; len];
        if let Err(fault) = self.memory.borrow().read(addr, &mut payload) {
            self.wire.borrow_mut().bus_faults.push(fault);
            return;
        }
        let frame = SimFrame {
            seq: self.tx_num,
            crc: crc32fast::hash(&payload),
            payload,
            fifo_overflow: false,
        };
        self.wire.borrow_mut().push(1 - self.side, frame);
        self.sent.push((sel, addr));
        self.raise(INT_T_DONE);
        if self.r8(REG_CFG) & CFG_TX_TOG_EN != 0 {
            self.tx_tog = !self.tx_tog;
        }
        self.tx_num = (self.tx_num + 1) & SC_NUM_MASK;
    }

    fn deliver(&mut self, frame: SimFrame) {
        if !self.enabled() || self.is_host() {
            return;
        }
        let sel = Selector::from_bit(self.rx_tog);
        let (addr_reg, limit_reg) = match sel {
            Selector::Zero => (REG_RX_ADDR0, REG_RX_LEN0),
            Selector::One => (REG_RX_ADDR1, REG_RX_LEN1),
        };
        let addr = self.r32(addr_reg);
        let limit = match self.r16(limit_reg) {
            RX_LEN_MAX => usize::from(MAX_DMA_LEN),
            n => usize::from(n),
        };
        let len = frame.payload.len().min(limit);
        // An unmapped address drops the data but still completes the packet.
        if let Err(fault) = self.memory.borrow_mut().write(addr, &frame.payload[..len]) {
            self.wire.borrow_mut().bus_faults.push(fault);
        }

        let mut status = 0;
        if crc32fast::hash(&frame.payload) != frame.crc {
            status |= STATUS_CRC_ERR;
        }
        if frame.seq != self.rx_num {
            status |= STATUS_NUM_MIS;
        }
        self.rtx_status = status;
        if status == 0 {
            self.received.push((sel, addr));
            if self.r8(REG_CFG) & CFG_RX_TOG_EN != 0 {
                self.rx_tog = !self.rx_tog;
            }
        }
        // A faulty packet does not toggle, but the expected number
        // resynchronizes on the sender's so the next packet is accepted.
        self.rx_num = (frame.seq + 1) & SC_NUM_MASK;
        self.raise(INT_R_DONE);
        if frame.fifo_overflow {
            self.raise(INT_FIFO_OV);
        }
    }
}

const RX_LEN_MAX: u16 = crate::dma_safety::RX_LEN_MAX_ENCODING;

/// Simulated HSPI register block of one board.
///
/// Cloning yields another handle to the same peripheral, so a test can keep
/// one handle while the link engine owns the other.
#[derive(Clone)]
pub struct SimHspi {
    inner: Rc<RefCell<State>>,
}

impl SimHspi {
    fn new(side: usize, memory: Rc<RefCell<SimMemory>>, wire: Rc<RefCell<SimWire>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(State {
                regs: [0; 0x30],
                side,
                memory,
                wire,
                tx_tog: false,
                tx_num: 0,
                rx_tog: false,
                rx_num: 0,
                rtx_status: 0,
                irq_enabled: false,
                sent: Vec::new(),
                received: Vec::new(),
            })),
        }
    }

    /// Two boards wired back-to-back, each with its own RAMX.
    pub fn pair() -> (Self, Self) {
        let wire = Rc::new(RefCell::new(SimWire::default()));
        let a = Self::new(0, Rc::new(RefCell::new(SimMemory::ramx())), wire.clone());
        let b = Self::new(1, Rc::new(RefCell::new(SimMemory::ramx())), wire);
        (a, b)
    }

    /// This board's RAMX.
    pub fn memory(&self) -> Rc<RefCell<SimMemory>> {
        self.inner.borrow().memory.clone()
    }

    /// The shared wire (fault injection).
    pub fn wire(&self) -> Rc<RefCell<SimWire>> {
        self.inner.borrow().wire.clone()
    }

    /// Deliver one queued packet to this board. Returns false if none was queued.
    pub fn pump(&self) -> bool {
        let mut st = self.inner.borrow_mut();
        let side = st.side;
        let frame = st.wire.borrow_mut().pop(side);
        match frame {
            Some(frame) => {
                st.deliver(frame);
                true
            }
            None => false,
        }
    }

    /// True if an enabled interrupt flag is set and the IRQ line is enabled.
    pub fn irq_pending(&self) -> bool {
        let st = self.inner.borrow();
        st.irq_enabled && st.r8(REG_INT_FLAG) & st.r8(REG_INT_EN) != 0
    }

    /// Force interrupt flags, as if the hardware raised them.
    pub fn raise(&self, flags: u8) {
        self.inner.borrow_mut().raise(flags);
    }

    /// Force the packet status register.
    pub fn set_rtx_status(&self, status: u8) {
        self.inner.borrow_mut().rtx_status = status;
    }

    /// Buffer half and address of every packet transmitted.
    pub fn sent(&self) -> Vec<(Selector, u32)> {
        self.inner.borrow().sent.clone()
    }

    /// Buffer half and address of every packet accepted without error.
    pub fn received(&self) -> Vec<(Selector, u32)> {
        self.inner.borrow().received.clone()
    }

    /// Forget the recorded transmit and receive history.
    pub fn clear_history(&self) {
        let mut st = self.inner.borrow_mut();
        st.sent.clear();
        st.received.clear();
    }
}

impl HspiPort for SimHspi {
    fn read8(&self, offset: u8) -> u8 {
        self.inner.borrow().r8(offset)
    }

    fn write8(&mut self, offset: u8, value: u8) {
        let mut st = self.inner.borrow_mut();
        match offset {
            REG_INT_FLAG => st.regs[usize::from(REG_INT_FLAG)] &= !value,
            REG_CTRL => {
                if value & (CTRL_ALL_CLR | CTRL_TRX_RST) != 0 {
                    st.reset_logic();
                }
                st.store(REG_CTRL, &[value & !CTRL_SW_ACT]);
                if value & CTRL_SW_ACT != 0 {
                    st.transmit();
                }
            }
            REG_RTX_STATUS | REG_TX_SC | REG_RX_SC => {}
            _ => st.store(offset, &[value]),
        }
    }

    fn read16(&self, offset: u8) -> u16 {
        self.inner.borrow().r16(offset)
    }

    fn write16(&mut self, offset: u8, value: u16) {
        self.inner.borrow_mut().store(offset, &value.to_le_bytes());
    }

    fn read32(&self, offset: u8) -> u32 {
        self.inner.borrow().r32(offset)
    }

    fn write32(&mut self, offset: u8, value: u32) {
        self.inner.borrow_mut().store(offset, &value.to_le_bytes());
    }

    fn enable_irq(&mut self) {
        self.inner.borrow_mut().irq_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hspi::{CFG_DAT32, CFG_DUALDMA};

    fn arm(host: &mut SimHspi, dev: &mut SimHspi) {
        host.write8(REG_CFG, CFG_MODE_HOST | CFG_DAT32 | CFG_TX_TOG_EN | CFG_DUALDMA);
        host.write32(REG_TX_ADDR0, 0x2002_0000);
        host.write32(REG_TX_ADDR1, 0x2002_0200);
        host.write16(REG_DMA_LEN0, 511);
        host.write16(REG_DMA_LEN1, 511);
        host.write8(REG_CTRL, CTRL_ENABLE | CTRL_DMA_EN);

        dev.write8(REG_CFG, CFG_DAT32 | CFG_RX_TOG_EN | CFG_DUALDMA);
        dev.write32(REG_RX_ADDR0, 0x2002_0000);
        dev.write32(REG_RX_ADDR1, 0x2002_0200);
        dev.write8(REG_CTRL, CTRL_ENABLE | CTRL_DMA_EN);
    }

    #[test]
    fn software_trigger_moves_one_packet() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        host.memory().borrow_mut().write_u32(0x2002_0000, 0xDEAD_BEEF).unwrap();

        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        assert_eq!(host.read8(REG_INT_FLAG) & INT_T_DONE, INT_T_DONE);
        assert_eq!(host.read8(REG_CTRL) & CTRL_SW_ACT, 0);
        assert_eq!(host.read8(REG_TX_SC) & SC_TOG, SC_TOG);

        assert!(dev.pump());
        assert_eq!(dev.read8(REG_INT_FLAG) & INT_R_DONE, INT_R_DONE);
        assert_eq!(dev.read8(REG_RTX_STATUS), 0);
        assert_eq!(dev.memory().borrow().read_u32(0x2002_0000).unwrap(), 0xDEAD_BEEF);
        assert!(!dev.pump());
    }

    #[test]
    fn corrupted_packet_sets_crc_error() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        host.wire().borrow_mut().corrupt_packet(1);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        dev.pump();
        assert_eq!(dev.read8(REG_RTX_STATUS), STATUS_CRC_ERR);
        assert_eq!(dev.read8(REG_RX_SC) & SC_TOG, 0);
    }

    #[test]
    fn dropped_packet_causes_sequence_mismatch() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        host.wire().borrow_mut().drop_packet(1);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        assert!(dev.pump());
        assert_eq!(dev.read8(REG_RTX_STATUS), STATUS_NUM_MIS);
        assert_eq!(dev.read8(REG_RX_SC) & SC_TOG, 0);

        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        dev.write8(REG_INT_FLAG, INT_R_DONE);
        assert!(dev.pump());
        assert_eq!(dev.read8(REG_RTX_STATUS), 0);
    }

    #[test]
    fn unmapped_receive_address_is_recorded_as_bus_fault() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        dev.write32(REG_RX_ADDR0, 0x1000_0000);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);

        assert!(dev.pump());
        assert_eq!(dev.read8(REG_INT_FLAG) & INT_R_DONE, INT_R_DONE, "packet still completes");
        let wire = dev.wire();
        assert_eq!(wire.borrow().bus_faults(), &[BusFault { addr: 0x1000_0000, len: 512 }]);
    }

    #[test]
    fn unmapped_transmit_address_sends_nothing() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        host.write32(REG_TX_ADDR0, 0x1000_0000);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);

        assert_eq!(host.read8(REG_INT_FLAG) & INT_T_DONE, 0);
        assert!(!dev.pump());
        assert_eq!(host.wire().borrow().bus_faults().len(), 1);
    }

    #[test]
    fn trx_reset_zeroes_sequence_and_toggle() {
        let (mut host, mut dev) = SimHspi::pair();
        arm(&mut host, &mut dev);
        host.set_bits8(REG_CTRL, CTRL_SW_ACT);
        assert_eq!(host.read8(REG_TX_SC), SC_TOG | 1);

        host.set_bits8(REG_CTRL, CTRL_TRX_RST);
        assert_eq!(host.read8(REG_TX_SC), 0);
    }

    #[test]
    fn interrupt_flags_are_write_one_to_clear() {
        let (mut host, _dev) = SimHspi::pair();
        host.raise(INT_T_DONE | INT_FIFO_OV);
        host.write8(REG_INT_FLAG, INT_T_DONE);
        assert_eq!(host.read8(REG_INT_FLAG), INT_FIFO_OV);
    }
}
