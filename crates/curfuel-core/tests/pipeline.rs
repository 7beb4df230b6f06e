mod common;

use common::{codes, read_records, test_config, Attempt, Cycle, ScriptedConnector};
use curfuel_core::config::DaemonConfig;
use curfuel_core::eventlog::RecordCode;
use curfuel_core::pipeline::{
    Assessment, PipelineStats, ReadingPipeline, DEVICE_RECOVERED, LOST_DEVICE,
};
use curfuel_core::protocol::{Reading, SerialChannel};
use curfuel_core::shutdown::Shutdown;
use curfuel_core::tank;
use curfuel_core::unit_conversion::LITRE_GALLON_FACTOR;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    log: PathBuf,
    config: DaemonConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("fuel.log");
    let config = test_config(&log);
    Fixture {
        _dir: dir,
        log,
        config,
    }
}

/// Run the pipeline against one scripted session
fn run_script(config: &DaemonConfig, attempts: Vec<Attempt>) -> PipelineStats {
    let shutdown = Shutdown::new();
    let mut channel = SerialChannel::new(
        config.serial.clone(),
        ScriptedConnector::new(attempts, &shutdown),
    );
    channel.open(&shutdown).unwrap();

    let mut pipeline = ReadingPipeline::from_config(config);
    pipeline.run(&mut channel, config.polling.run_interval, &shutdown)
}

#[test]
fn test_half_full_reading_is_logged() {
    let fx = fixture();
    let mut pipeline = ReadingPipeline::from_config(&fx.config);

    let outcome = pipeline
        .handle_value(&Reading::new("5021", 511.5))
        .unwrap();

    let expected_m3 = tank::full_volume(&fx.config.tank) / 2.0;
    let Assessment::InRange(volume) = outcome else {
        panic!("511.5 is in range");
    };
    assert!((volume.liquid_depth_m - 0.34).abs() < 1e-12);
    assert_eq!(volume.volume_m3, expected_m3);

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "r");
    let gallons = expected_m3 * 1000.0 * LITRE_GALLON_FACTOR;
    assert_eq!(
        records[0].payload,
        format!("5021:511.500000:{:.6}", gallons)
    );
    assert!((records[0].gallons().unwrap() - gallons).abs() < 1e-6);
}

#[test]
fn test_below_threshold_warns_only() {
    let fx = fixture();
    let mut pipeline = ReadingPipeline::from_config(&fx.config);

    let outcome = pipeline.handle_value(&Reading::new("1", -5.0)).unwrap();
    assert_eq!(outcome, Assessment::BelowRange);

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "w");
    assert!(records[0].payload.contains("below threshold (raw=-5)"));
}

#[test]
fn test_above_threshold_truncates_raw() {
    let fx = fixture();
    let mut pipeline = ReadingPipeline::from_config(&fx.config);

    pipeline.handle_value(&Reading::new("1", 1100.7)).unwrap();

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "w");
    assert_eq!(records[0].payload, "above threshold (raw=1100)");
}

#[test]
fn test_device_loss_and_recovery() {
    let fx = fixture();
    let stats = run_script(
        &fx.config,
        vec![
            Attempt::Connect(vec![
                Cycle::Reply("1:raw_fuel_level:100\n"),
                Cycle::Fail,
            ]),
            Attempt::Refuse,
            Attempt::Refuse,
            Attempt::Connect(vec![Cycle::Reply("2:raw_fuel_level:200\n")]),
        ],
    );

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "rewr");
    assert_eq!(records[1].code, RecordCode::Error);
    assert_eq!(records[1].payload, LOST_DEVICE);
    assert_eq!(records[2].payload, DEVICE_RECOVERED);
    assert!(records[3].payload.starts_with("2:200.000000:"));
    assert_eq!(stats.outages, 1);
    assert_eq!(stats.readings_logged, 2);
}

#[test]
fn test_repeated_values_are_suppressed() {
    let fx = fixture();
    let script = vec![Attempt::Connect(vec![
        Cycle::Reply("1:raw_fuel_level:100\n"),
        Cycle::Reply("2:raw_fuel_level:100\n"),
        Cycle::Reply("3:raw_fuel_level:200\n"),
        Cycle::Reply("4:raw_fuel_level:100\n"),
    ])];

    let stats = run_script(&fx.config, script.clone());
    assert_eq!(codes(&read_records(&fx.log)), "rrr");
    assert_eq!(stats.suppressed, 1);

    let mut every_sample = fixture();
    every_sample.config.polling.suppress_repeats = false;
    run_script(&every_sample.config, script);
    assert_eq!(codes(&read_records(&every_sample.log)), "rrrr");
}

#[test]
fn test_first_reading_of_zero_is_logged() {
    let fx = fixture();
    run_script(
        &fx.config,
        vec![Attempt::Connect(vec![Cycle::Reply("1:raw_fuel_level:0\n")])],
    );
    assert_eq!(codes(&read_records(&fx.log)), "r");
}

#[test]
fn test_bad_lines_are_skipped() {
    let fx = fixture();
    let stats = run_script(
        &fx.config,
        vec![Attempt::Connect(vec![
            Cycle::Reply("garbage\n"),
            Cycle::Reply("5:unknown_command:x\n"),
            Cycle::Reply("6:raw_fuel_level:abc\n"),
            Cycle::Silent,
            Cycle::Reply("7:raw_fuel_level:300\n"),
        ])],
    );

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "r");
    assert!(records[0].payload.starts_with("7:300.000000:"));
    assert_eq!(stats.decode_errors, 3);
    assert_eq!(stats.lines, 4);
}

#[test]
fn test_non_finite_values_never_reach_the_log() {
    let fx = fixture();
    let stats = run_script(
        &fx.config,
        vec![Attempt::Connect(vec![
            Cycle::Reply("1:raw_fuel_level:nan\n"),
            Cycle::Reply("2:raw_fuel_level:nan\n"),
            Cycle::Reply("3:raw_fuel_level:inf\n"),
            Cycle::Reply("4:raw_fuel_level:511.5\n"),
        ])],
    );

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "r");
    assert!(records[0].payload.starts_with("4:511.500000:"));
    assert_eq!(stats.decode_errors, 3);
    assert_eq!(stats.out_of_range, 0);
}

#[test]
fn test_unterminated_line_is_dropped_at_cycle_end() {
    let fx = fixture();
    run_script(
        &fx.config,
        vec![Attempt::Connect(vec![
            Cycle::Reply("8:raw_fuel_"),
            Cycle::Reply("9:raw_fuel_level:400\n"),
        ])],
    );

    let records = read_records(&fx.log);
    assert_eq!(codes(&records), "r");
    assert!(records[0].payload.starts_with("9:400.000000:"));
}

#[test]
fn test_calibration_tracks_bounds_without_logging() {
    let fx = fixture();
    let shutdown = Shutdown::new();
    let mut channel = SerialChannel::new(
        fx.config.serial.clone(),
        ScriptedConnector::new(
            vec![
                Attempt::Connect(vec![
                    Cycle::Reply("1:raw_fuel_level:300.25\n"),
                    Cycle::Reply("2:raw_fuel_level:120\n"),
                    Cycle::Fail,
                ]),
                Attempt::Connect(vec![
                    Cycle::Reply("nonsense\n"),
                    Cycle::Reply("3:raw_fuel_level:845.5\n"),
                ]),
            ],
            &shutdown,
        ),
    );
    channel.open(&shutdown).unwrap();

    let pipeline = ReadingPipeline::from_config(&fx.config);
    let mut reports = Vec::new();
    let bounds = pipeline.calibrate(
        &mut channel,
        fx.config.polling.calibration_interval,
        &shutdown,
        |b| reports.push(b.to_string()),
    );

    assert_eq!(bounds.min, 120.0);
    assert_eq!(bounds.max, 845.5);
    assert_eq!(bounds.samples, 3);
    assert_eq!(
        reports,
        vec![
            "Min: 300.25  Max: 300.25",
            "Min: 120.00  Max: 300.25",
            "Min: 120.00  Max: 845.50",
        ]
    );
    assert!(!fx.log.exists());
}
