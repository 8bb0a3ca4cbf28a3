//! Wire-level SerDes simulation.
//!
//! Models the PLL lock delay, the link-init handshake that raises TX_READY,
//! single-shot transmission on TX_START, and single or double buffer reception.

use super::SimMemory;
use crate::dma::{BusFault, BusMemory};
use crate::serdes::{
    CTRL_DMA_EN, CTRL_LINK_RESET, CTRL_PHY_RESET, CTRL_PLL_PU, CTRL_RX_EN, CTRL_TX_EN,
    CUSTOM_NUMBER_MAX, INT_ALL, INT_FIFO_OV, INT_RX_DONE, INT_RX_ERR, INT_TX_DONE, REG_CTRL,
    REG_DATA0, REG_DATA1, REG_DMA0, REG_DMA1, REG_INT_EN, REG_RTX_CTRL, REG_RX_LEN0, REG_RX_LEN1,
    REG_STATUS, RTX_BUF_MODE, RTX_LEN_MASK, RTX_LINK_INIT, RTX_TX_START, STATUS_PLL_READY,
    STATUS_RX_CRC_OK, STATUS_SEQ_MATCH, STATUS_TX_READY, SerdesPort,
};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Clone)]
struct Packet {
    custom: u32,
    payload: Vec<u8>,
    crc_ok: bool,
    fifo_overflow: bool,
}

/// Shared SerDes medium with fault injection keyed by packet number (from 1).
#[derive(Default)]
pub struct SimSerdesWire {
    queues: [VecDeque<Packet>; 2],
    sent: u32,
    corrupt: Vec<u32>,
    overflow: Vec<u32>,
    bus_faults: Vec<BusFault>,
}

impl SimSerdesWire {
    /// Deliver packet `k` with a CRC error.
    pub fn corrupt_packet(&mut self, k: u32) {
        self.corrupt.push(k);
    }

    /// Report a FIFO overflow together with packet `k`.
    pub fn overflow_on_packet(&mut self, k: u32) {
        self.overflow.push(k);
    }

    /// Packets put on the wire so far.
    pub fn packets_sent(&self) -> u32 {
        self.sent
    }

    /// DMA accesses either board made outside its memory.
    pub fn bus_faults(&self) -> &[BusFault] {
        &self.bus_faults
    }
}

struct State {
    regs: [u32; 10],
    side: usize,
    memory: Rc<RefCell<SimMemory>>,
    wire: Rc<RefCell<SimSerdesWire>>,
    pll_lock_reads: Option<u32>,
    pll_reads: u32,
    link_up: bool,
    rx_next: usize,
    analog_configured: bool,
    irq_enabled: bool,
}

impl State {
    fn slot(offset: u8) -> usize {
        usize::from(offset / 4)
    }

    fn reg(&self, offset: u8) -> u32 {
        self.regs.get(Self::slot(offset)).copied().unwrap_or(0)
    }

    fn set_reg(&mut self, offset: u8, value: u32) {
        if let Some(r) = self.regs.get_mut(Self::slot(offset)) {
            *r = value;
        }
    }

    fn pll_locked(&self) -> bool {
        let ctrl = self.reg(REG_CTRL);
        let powered = ctrl & CTRL_PLL_PU != 0 && ctrl & CTRL_PHY_RESET == 0;
        powered && self.pll_lock_reads.is_some_and(|n| self.pll_reads >= n)
    }

    fn status(&mut self) -> u32 {
        let ctrl = self.reg(REG_CTRL);
        if ctrl & CTRL_PLL_PU != 0 {
            self.pll_reads = self.pll_reads.saturating_add(1);
        }
        let mut status = self.reg(REG_STATUS) & !(STATUS_PLL_READY | STATUS_TX_READY);
        if self.pll_locked() {
            status |= STATUS_PLL_READY;
            let tx_busy = self.reg(REG_RTX_CTRL) & RTX_TX_START != 0;
            if self.link_up && ctrl & CTRL_TX_EN != 0 && !tx_busy {
                status |= STATUS_TX_READY;
            }
        }
        status
    }

    fn write_ctrl(&mut self, value: u32) {
        if value & (CTRL_PHY_RESET | CTRL_LINK_RESET) != 0 {
            self.link_up = false;
            self.rx_next = 0;
        }
        if value & CTRL_PHY_RESET != 0 {
            self.pll_reads = 0;
        }
        self.set_reg(REG_CTRL, value);
    }

    fn write_rtx(&mut self, value: u32) {
        let prev = self.reg(REG_RTX_CTRL);
        self.set_reg(REG_RTX_CTRL, value);
        if value & RTX_LINK_INIT != 0 && self.pll_locked() {
            self.link_up = true;
        }
        if value & RTX_BUF_MODE != prev & RTX_BUF_MODE {
            self.rx_next = 0;
        }
        if value & RTX_TX_START != 0 && prev & RTX_TX_START == 0 {
            self.transmit();
        }
    }

    fn transmit(&mut self) {
        let ctrl = self.reg(REG_CTRL);
        if !self.link_up || ctrl & (CTRL_TX_EN | CTRL_DMA_EN) != (CTRL_TX_EN | CTRL_DMA_EN) {
            return;
        }
        let len = (self.reg(REG_RTX_CTRL) & RTX_LEN_MASK) as usize;
        let mut payload = std::vec![0u8; len];
        if let Err(fault) = self.memory.borrow().read(self.reg(REG_DMA0), &mut payload) {
            self.wire.borrow_mut().bus_faults.push(fault);
            return;
        }
        let mut wire = self.wire.borrow_mut();
        wire.sent += 1;
        let k = wire.sent;
        let packet = Packet {
            custom: self.reg(REG_DATA0) & CUSTOM_NUMBER_MAX,
            payload,
            crc_ok: !wire.corrupt.contains(&k),
            fifo_overflow: wire.overflow.contains(&k),
        };
        if let Some(q) = wire.queues.get_mut(1 - self.side) {
            q.push_back(packet);
        }
        drop(wire);
        let st = self.reg(REG_STATUS);
        self.set_reg(REG_STATUS, st | INT_TX_DONE);
    }

    fn deliver(&mut self, packet: Packet) {
        let ctrl = self.reg(REG_CTRL);
        if !self.pll_locked() || ctrl & (CTRL_RX_EN | CTRL_DMA_EN) != (CTRL_RX_EN | CTRL_DMA_EN) {
            return;
        }
        let double = self.reg(REG_RTX_CTRL) & RTX_BUF_MODE != 0;
        let buf = if double { self.rx_next } else { 0 };
        let (dma, len_reg, data_reg) = if buf == 0 {
            (REG_DMA0, REG_RX_LEN0, REG_DATA0)
        } else {
            (REG_DMA1, REG_RX_LEN1, REG_DATA1)
        };
        let addr = self.reg(dma);
        if let Err(fault) = self.memory.borrow_mut().write(addr, &packet.payload) {
            self.wire.borrow_mut().bus_faults.push(fault);
        }
        self.set_reg(len_reg, packet.payload.len() as u32);
        self.set_reg(data_reg, packet.custom);
        if double {
            self.rx_next ^= 1;
        }

        let mut status = self.reg(REG_STATUS) & !(STATUS_RX_CRC_OK | STATUS_SEQ_MATCH);
        status |= INT_RX_DONE | STATUS_SEQ_MATCH;
        if packet.crc_ok {
            status |= STATUS_RX_CRC_OK;
        } else {
            status |= INT_RX_ERR;
        }
        if packet.fifo_overflow {
            status |= INT_FIFO_OV;
        }
        self.set_reg(REG_STATUS, status);
    }
}

/// Simulated SerDes block of one board. Clones share the peripheral.
#[derive(Clone)]
pub struct SimSerdes {
    inner: Rc<RefCell<State>>,
}

impl SimSerdes {
    fn new(side: usize, wire: Rc<RefCell<SimSerdesWire>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(State {
                regs: [0; 10],
                side,
                memory: Rc::new(RefCell::new(SimMemory::ramx())),
                wire,
                pll_lock_reads: Some(3),
                pll_reads: 0,
                link_up: false,
                rx_next: 0,
                analog_configured: false,
                irq_enabled: false,
            })),
        }
    }

    /// Two boards linked back-to-back, each with its own RAMX.
    pub fn pair() -> (Self, Self) {
        let wire = Rc::new(RefCell::new(SimSerdesWire::default()));
        (Self::new(0, wire.clone()), Self::new(1, wire))
    }

    /// PLL never reports ready.
    pub fn pll_never_locks(&self) {
        self.inner.borrow_mut().pll_lock_reads = None;
    }

    /// This board's RAMX.
    pub fn memory(&self) -> Rc<RefCell<SimMemory>> {
        self.inner.borrow().memory.clone()
    }

    /// The shared wire (fault injection).
    pub fn wire(&self) -> Rc<RefCell<SimSerdesWire>> {
        self.inner.borrow().wire.clone()
    }

    /// True once the analog front end was programmed.
    pub fn analog_configured(&self) -> bool {
        self.inner.borrow().analog_configured
    }

    /// Deliver one queued packet to this board. Returns false if none was queued.
    pub fn pump(&self) -> bool {
        let mut st = self.inner.borrow_mut();
        let side = st.side;
        let packet = st.wire.borrow_mut().queues.get_mut(side).and_then(VecDeque::pop_front);
        match packet {
            Some(p) => {
                st.deliver(p);
                true
            }
            None => false,
        }
    }

    /// True if an enabled interrupt flag is set and the IRQ line is enabled.
    pub fn irq_pending(&self) -> bool {
        let st = self.inner.borrow();
        st.irq_enabled && st.reg(REG_STATUS) & st.reg(REG_INT_EN) & INT_ALL != 0
    }
}

impl SerdesPort for SimSerdes {
    fn read(&self, offset: u8) -> u32 {
        let mut st = self.inner.borrow_mut();
        match offset {
            REG_STATUS => st.status(),
            _ => st.reg(offset),
        }
    }

    fn write(&mut self, offset: u8, value: u32) {
        let mut st = self.inner.borrow_mut();
        match offset {
            REG_CTRL => st.write_ctrl(value),
            REG_RTX_CTRL => st.write_rtx(value),
            REG_STATUS => {
                let v = st.reg(REG_STATUS) & !(value & INT_ALL);
                st.set_reg(REG_STATUS, v);
            }
            REG_RX_LEN0 | REG_RX_LEN1 => {}
            _ => st.set_reg(offset, value),
        }
    }

    fn analog_setup(&mut self) {
        self.inner.borrow_mut().analog_configured = true;
    }

    fn enable_irq(&mut self) {
        self.inner.borrow_mut().irq_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serdes::{CTRL_POWER_BITS, PllFreq};

    #[test]
    fn pll_locks_after_a_few_status_reads() {
        let (mut a, _b) = SimSerdes::pair();
        a.write(REG_CTRL, CTRL_POWER_BITS | PllFreq::G1_20.ctrl_bits());
        assert_eq!(a.read(REG_STATUS) & STATUS_PLL_READY, 0);
        assert_eq!(a.read(REG_STATUS) & STATUS_PLL_READY, 0);
        assert_ne!(a.read(REG_STATUS) & STATUS_PLL_READY, 0);
    }

    #[test]
    fn unmapped_transmit_buffer_is_recorded_as_bus_fault() {
        let (mut a, _b) = SimSerdes::pair();
        a.write(REG_CTRL, CTRL_POWER_BITS | CTRL_TX_EN | CTRL_DMA_EN);
        for _ in 0..3 {
            a.read(REG_STATUS);
        }
        a.write(REG_RTX_CTRL, RTX_LINK_INIT);
        a.write(REG_DMA0, 0x1000_0000);
        a.write(REG_RTX_CTRL, RTX_LINK_INIT | RTX_TX_START | 64);

        let wire = a.wire();
        assert_eq!(wire.borrow().bus_faults(), &[BusFault { addr: 0x1000_0000, len: 64 }]);
        assert_eq!(wire.borrow().packets_sent(), 0);
        assert_eq!(a.read(REG_STATUS) & INT_TX_DONE, 0);
    }

    #[test]
    fn status_flags_are_write_one_to_clear() {
        let (mut a, _b) = SimSerdes::pair();
        a.inner.borrow_mut().set_reg(REG_STATUS, INT_RX_DONE | INT_FIFO_OV);
        a.write(REG_STATUS, INT_RX_DONE);
        assert_eq!(a.read(REG_STATUS) & INT_ALL, INT_FIFO_OV);
    }
}
