//! HSPI demo steps between two simulated boards.
//!
//! Run with: cargo test -p firmware --test hspi_demo

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::arithmetic_side_effects)]

mod common;

use common::{test_log, HspiBench};
use firmware::app::hspi::{self, RxOutcome};
use firmware::app::AppError;
use firmware::pattern::expected_word;
use firmware::Shared;
use link::{LinkError, LinkState, LinkStatus, StatusCell};
use platform::config::LINK_WINDOW_BASE;
use platform::BusMemory;

#[test]
fn test_host_burst_is_verified_by_device() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let (mut host_ram, mut dev_ram) = (bench.host_ram(), bench.dev_ram());
    let (mut host_log, mut dev_log) = (test_log(), test_log());

    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();
    assert_eq!(ds.load(), LinkStatus::Active);
    hspi::host_setup(&bench.host()).unwrap();

    let us = hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
    assert!(us > 0);
    assert!(host_log.writer().contains("Start Tx 32K\n"));
    assert!(host_log.writer().contains(&format!("Tx end {us}us\n")));
    assert_eq!(bench.host_port().wire().borrow().packets_sent(), 64);

    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert_eq!(outcome, RxOutcome::Verified);
    let text = dev_log.writer();
    assert!(text.contains("Wait Rx\n"));
    assert!(text.contains("Rx_End\n"));
    assert!(text.contains("Verify suc\n"));
    assert!(text.contains("RX[0]=0x55555555 [8191]=0x55557554\n"));
    assert!(text.contains("Clear RAMX 32K\n"));
    assert!(!text.contains("HSPI reinit"));

    // Window cleared and the receiver re-armed for the next burst.
    assert_eq!(dev_ram.read_u32(LINK_WINDOW_BASE).unwrap(), 0);
    assert_eq!(ds.load(), LinkStatus::Active);
}

#[test]
fn test_repeated_bursts_all_verify() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let (mut host_ram, mut dev_ram) = (bench.host_ram(), bench.dev_ram());
    let (mut host_log, mut dev_log) = (test_log(), test_log());
    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();
    hspi::host_setup(&bench.host()).unwrap();

    for _ in 0..3 {
        hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
        let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
        assert_eq!(outcome, RxOutcome::Verified);
    }
    assert_eq!(dev_log.writer().matches("Verify suc").count(), 3);
}

#[test]
fn test_crc_error_at_packet_32_then_retry_verifies() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let (mut host_ram, mut dev_ram) = (bench.host_ram(), bench.dev_ram());
    let (mut host_log, mut dev_log) = (test_log(), test_log());
    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();
    hspi::host_setup(&bench.host()).unwrap();
    bench.host_port().wire().borrow_mut().corrupt_packet(32);

    // The sender has no way to notice.
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert_eq!(outcome, RxOutcome::Failed(LinkError::Crc));
    let text = dev_log.writer();
    assert!(text.contains("Rx_End err"));
    assert!(!text.contains("Verify suc"));
    assert!(text.contains("HSPI reinit\n"));
    assert_eq!(ds.load(), LinkStatus::Active, "receiver re-armed in place");

    bench.host_port().wire().borrow_mut().clear_faults();
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert_eq!(outcome, RxOutcome::Verified);
}

#[test]
fn test_corrupted_word_is_reported_with_its_address() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let (mut host_ram, mut dev_ram) = (bench.host_ram(), bench.dev_ram());
    let (mut host_log, mut dev_log) = (test_log(), test_log());
    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();
    hspi::host_setup(&bench.host()).unwrap();
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();

    // A word flipped in RAMX after the DMA wrote it.
    let addr = LINK_WINDOW_BASE + 100 * 4;
    dev_ram.write_u32(addr, 0xDEAD_BEEF).unwrap();

    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    let RxOutcome::Mismatch(m) = outcome else {
        panic!("expected a mismatch, got {outcome:?}");
    };
    assert_eq!(m.index, 100);
    assert_eq!(m.addr, addr);
    assert_eq!(m.found, 0xDEAD_BEEF);
    assert_eq!(m.expected, expected_word(100));
    let text = dev_log.writer();
    assert!(text.contains(&m.to_string()));
    assert!(text.contains("EF BE AD DE"), "hex dump starts at the bad word");
    assert!(text.contains("HSPI reinit\n"));
}

#[test]
fn test_device_without_traffic_reports_idle() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let mut dev_ram = bench.dev_ram();
    let mut dev_log = test_log();
    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();

    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert_eq!(outcome, RxOutcome::Idle);
    assert!(!dev_log.writer().contains("Rx_End"));
    assert_eq!(ds.load(), LinkStatus::Active, "still waiting for the host");
}

#[test]
fn test_stalled_host_burst_times_out_and_recovers() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let mut host_ram = bench.host_ram();
    let mut host_log = test_log();
    hspi::host_setup(&bench.host()).unwrap();

    bench.stalled.set(true);
    let err = hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap_err();
    assert_eq!(err, AppError::Link(LinkError::WaitTimeout));
    assert!(host_log.writer().contains("Tx err"));
    assert_eq!(bench.host().lock(|l| l.state()), Some(LinkState::Idle));

    bench.stalled.set(false);
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
    assert_eq!(hs.load(), LinkStatus::Idle);
    // One packet from the stalled burst, then a full burst.
    assert_eq!(bench.host_port().wire().borrow().packets_sent(), 65);
}

#[test]
fn test_host_timeout_reset_keeps_armed_device_in_step() {
    let (hs, ds) = (StatusCell::new(), StatusCell::new());
    let bench = HspiBench::new(&hs, &ds);
    let (mut host_ram, mut dev_ram) = (bench.host_ram(), bench.dev_ram());
    let (mut host_log, mut dev_log) = (test_log(), test_log());
    hspi::device_setup(&bench.dev(), &mut dev_ram).unwrap();
    hspi::host_setup(&bench.host()).unwrap();

    // One packet leaves, then the host gives up and resets on its own.
    bench.stalled.set(true);
    let err = hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap_err();
    assert_eq!(err, AppError::Link(LinkError::WaitTimeout));
    bench.stalled.set(false);
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();

    // The stale packet shifts the burst by one slot on the device.
    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert!(matches!(outcome, RxOutcome::Mismatch(_)), "got {outcome:?}");
    assert!(dev_log.writer().contains("HSPI reinit\n"));
    assert_eq!(ds.load(), LinkStatus::Active);

    // 65 packets so far: the counters agree again without a device reset.
    hspi::host_burst(&bench.host(), &hs, &mut host_ram, &mut host_log).unwrap();
    let outcome = hspi::device_receive(&bench.dev(), &ds, &mut dev_ram, &mut dev_log).unwrap();
    assert_eq!(outcome, RxOutcome::Verified);
    assert_eq!(bench.host_port().wire().borrow().packets_sent(), 129);
}

#[test]
fn test_steps_without_session_report_not_configured() {
    struct Empty;
    impl Shared for Empty {
        type Session = link::HspiLink<'static, platform::mocks::SimHspi>;
        fn lock<R, F: FnOnce(&mut Self::Session) -> R>(&self, _f: F) -> Option<R> {
            None
        }
    }
    assert_eq!(hspi::host_setup(&Empty), Err(AppError::Link(LinkError::NotConfigured)));
}
