use imagepress_core::stamp::{SCRATCH_DIR, STAMP_FILE};
use imagepress_core::{BuildStamp, Error};
use tempfile::TempDir;

#[test]
fn write_creates_scratch_dir_and_state_file() {
    let tmp = TempDir::new().unwrap();
    let stamp = BuildStamp::now("abc1234");

    let path = stamp.write(tmp.path()).unwrap();

    assert_eq!(path, tmp.path().join(SCRATCH_DIR).join(STAMP_FILE));
    assert!(path.is_file());
}

#[test]
fn write_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let stamp = BuildStamp::now("abc1234");
    stamp.write(tmp.path()).unwrap();

    let loaded = BuildStamp::load(tmp.path()).unwrap();
    assert_eq!(loaded, stamp);
}

#[test]
fn write_is_idempotent_and_overwrites() {
    let tmp = TempDir::new().unwrap();
    BuildStamp::now("oldcommit").write(tmp.path()).unwrap();
    let newer = BuildStamp::now("newcommit");
    newer.write(tmp.path()).unwrap();

    let loaded = BuildStamp::load(tmp.path()).unwrap();
    assert_eq!(loaded.commit, "newcommit");
}

#[test]
fn load_without_stamp_points_at_the_stamp_command() {
    let tmp = TempDir::new().unwrap();
    let result = BuildStamp::load(tmp.path());

    assert!(matches!(result, Err(Error::StampMissing(_))));
    let message = BuildStamp::load(tmp.path()).unwrap_err().to_string();
    assert!(message.contains("imagepress stamp"));
}

#[test]
fn load_rejects_corrupt_state_file() {
    let tmp = TempDir::new().unwrap();
    let scratch = tmp.path().join(SCRATCH_DIR);
    std::fs::create_dir_all(&scratch).unwrap();
    std::fs::write(scratch.join(STAMP_FILE), "not {{ toml").unwrap();

    let result = BuildStamp::load(tmp.path());
    assert!(matches!(result, Err(Error::StampParse { .. })));
}

#[test]
fn fresh_stamp_is_not_older_than_process_observation() {
    let before = chrono::Utc::now() - chrono::Duration::seconds(1);
    let stamp = BuildStamp::now("abc1234");

    let instant = stamp.timestamp_utc().expect("fresh stamp must parse");
    assert!(instant >= before - chrono::Duration::seconds(1));
    assert!(instant <= chrono::Utc::now() + chrono::Duration::seconds(1));
}
