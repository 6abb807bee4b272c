// tests/backup.rs

//! Backup naming, archive fidelity and restore against real directories.

mod common;

use chrono::NaiveDate;
use common::{snapshot, write_world, zip_files, ClaimsPathMidWrite, TestServer};
use std::fs;
use worldpack::archive::{self, ContainerFormat};
use worldpack::{BackupManager, Error, SilentProgress};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

#[test]
fn test_first_backup_has_no_suffix() {
    let server = TestServer::new();
    server.live_world("Core Craft TK2", &[], &[]);
    let backups = BackupManager::from_layout(&server.layout);

    let archive = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap();

    assert_eq!(archive.file_name(), "Core_Craft_TK2_Mar05_2024.mcworld");
    assert!(server.layout.backup_dir.join("Core_Craft_TK2_Mar05_2024.mcworld").is_file());
}

#[test]
fn test_same_day_backups_get_sequential_suffixes() {
    let server = TestServer::new();
    server.live_world("Core Craft TK2", &[], &[]);
    let backups = BackupManager::from_layout(&server.layout);
    let progress = SilentProgress::new();

    let names: Vec<String> = (0..3)
        .map(|_| {
            backups
                .create_on(&server.layout.live_world, day(), &progress)
                .unwrap()
                .file_name()
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "Core_Craft_TK2_Mar05_2024.mcworld",
            "Core_Craft_TK2_Mar05_2024a.mcworld",
            "Core_Craft_TK2_Mar05_2024b.mcworld",
        ]
    );

    // A different day starts over
    let next_day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    let archive = backups
        .create_on(&server.layout.live_world, next_day, &progress)
        .unwrap();
    assert_eq!(archive.file_name(), "Core_Craft_TK2_Mar06_2024.mcworld");
}

#[test]
fn test_suffix_follows_existing_files() {
    let server = TestServer::new();
    server.live_world("Core Craft TK2", &[], &[]);
    let dir = &server.layout.backup_dir;
    fs::create_dir_all(dir).unwrap();
    for suffix in ["", "a", "b", "c"] {
        fs::write(dir.join(format!("Core_Craft_TK2_Mar05_2024{}.mcworld", suffix)), b"old").unwrap();
    }
    // Same stem with another extension does not count
    fs::write(dir.join("Core_Craft_TK2_Mar05_2024d.zip"), b"other").unwrap();

    let backups = BackupManager::from_layout(&server.layout);
    let archive = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap();

    assert_eq!(archive.file_name(), "Core_Craft_TK2_Mar05_2024d.mcworld");
    // Existing backups are never overwritten
    assert_eq!(fs::read(dir.join("Core_Craft_TK2_Mar05_2024c.mcworld")).unwrap(), b"old");
}

#[test]
fn test_archive_round_trip_is_exact() {
    let source = tempfile::tempdir().unwrap();
    write_world(source.path(), "Round Trip", &[("p-1", [1, 0, 0])], &[]);
    fs::create_dir_all(source.path().join("db/lost")).unwrap();
    fs::create_dir_all(source.path().join("resource_packs/inner/deep")).unwrap();
    fs::write(source.path().join("resource_packs/inner/deep/blob.bin"), (0..=255u8).collect::<Vec<_>>()).unwrap();

    let out = tempfile::tempdir().unwrap();
    let container = out.path().join("round.mcworld");
    let summary = archive::write_dir(source.path(), &container, &SilentProgress::new()).unwrap();
    assert_eq!(summary.files, 7);

    let restored = out.path().join("restored");
    let extracted = archive::extract_to(&container, &restored).unwrap();
    assert_eq!(extracted, 7);

    assert_eq!(snapshot(&restored), snapshot(source.path()));
    // Empty directories come back too
    assert!(restored.join("db/lost").is_dir());
}

#[test]
fn test_failed_write_leaves_nothing() {
    let server = TestServer::new();
    server.live_world("Core Craft", &[], &[]);
    // A file where the backup directory should be
    fs::write(&server.layout.backup_dir, b"in the way").unwrap();

    let backups = BackupManager::from_layout(&server.layout);
    let err = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap_err();

    assert!(matches!(err, Error::ArchiveWriteFailed { .. }));
    assert_eq!(fs::read(&server.layout.backup_dir).unwrap(), b"in the way");
}

#[test]
fn test_backup_of_missing_world() {
    let server = TestServer::new();
    let backups = BackupManager::from_layout(&server.layout);

    let err = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap_err();
    assert!(matches!(err, Error::WorldNotFound(_)));
    assert!(!server.layout.backup_dir.exists());
}

#[test]
fn test_restore_replaces_live_world() {
    let server = TestServer::new();
    server.live_world("Before", &[("p-1", [1, 0, 0])], &[]);
    let backups = BackupManager::from_layout(&server.layout);
    let progress = SilentProgress::new();

    let saved = backups
        .create_on(&server.layout.live_world, day(), &progress)
        .unwrap();
    let saved_tree = snapshot(&server.layout.live_world);

    fs::remove_dir_all(&server.layout.live_world).unwrap();
    server.live_world("After", &[], &[]);
    fs::write(server.layout.live_world.join("extra.txt"), b"added later").unwrap();

    let located = backups.locate(&saved.file_name()).unwrap();
    let swap = backups
        .restore(&located, &server.layout.live_world, &progress)
        .unwrap();

    assert_eq!(snapshot(&server.layout.live_world), saved_tree);
    assert!(!server.layout.live_world.join("extra.txt").exists());

    // The world being replaced was saved first
    let safety = swap.safety_backup.unwrap();
    assert!(safety.file_name().starts_with("After_"));
    assert!(safety.path.is_file());
}

#[test]
fn test_restore_from_bad_container_keeps_live_world() {
    let server = TestServer::new();
    server.live_world("Keep Me", &[], &[]);
    let before = snapshot(&server.layout.live_world);
    fs::create_dir_all(&server.layout.backup_dir).unwrap();
    let bogus = server.layout.backup_dir.join("Keep_Me_Mar05_2024.mcworld");
    fs::write(&bogus, b"garbage").unwrap();

    let backups = BackupManager::from_layout(&server.layout);
    assert!(backups
        .restore(&bogus, &server.layout.live_world, &SilentProgress::new())
        .is_err());

    assert_eq!(snapshot(&server.layout.live_world), before);
    assert_eq!(backups.list().unwrap().len(), 1);
}

#[test]
fn test_list_newest_first() {
    let server = TestServer::new();
    server.live_world("Core Craft", &[], &[]);
    let backups = BackupManager::from_layout(&server.layout);
    let progress = SilentProgress::new();
    for _ in 0..3 {
        backups
            .create_on(&server.layout.live_world, day(), &progress)
            .unwrap();
    }
    fs::write(server.layout.backup_dir.join("notes.txt"), b"x").unwrap();

    let listed: Vec<String> = backups
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.file_name)
        .collect();
    assert_eq!(
        listed,
        vec![
            "Core_Craft_Mar05_2024b.mcworld",
            "Core_Craft_Mar05_2024a.mcworld",
            "Core_Craft_Mar05_2024.mcworld",
        ]
    );
}

#[test]
fn test_locate_rejects_unknown_backup() {
    let server = TestServer::new();
    let backups = BackupManager::from_layout(&server.layout);
    assert!(matches!(
        backups.locate("nothing.mcworld"),
        Err(Error::WorldNotFound(_))
    ));
    assert!(backups.locate("../escape.mcworld").is_err());
}

#[test]
fn test_backups_are_zip_containers() {
    let server = TestServer::new();
    server.live_world("Core Craft", &[], &[]);
    let backups = BackupManager::from_layout(&server.layout);

    let archive = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap();

    let mut head = [0u8; 4];
    std::io::Read::read_exact(&mut fs::File::open(&archive.path).unwrap(), &mut head).unwrap();
    assert_eq!(&head, b"PK\x03\x04");
    assert_eq!(ContainerFormat::detect(&archive.path).unwrap(), ContainerFormat::Zip);
}

#[test]
fn test_restore_from_plain_zip_export() {
    let server = TestServer::new();
    server.live_world("Current", &[], &[]);

    let exported = tempfile::tempdir().unwrap();
    write_world(exported.path(), "Exported", &[("p-9", [2, 0, 0])], &[]);
    let expected = snapshot(exported.path());
    let container = server.layout.backup_dir.join("Exported_Mar05_2024.mcworld");
    zip_files(exported.path(), &container);

    let backups = BackupManager::from_layout(&server.layout);
    backups
        .restore(&container, &server.layout.live_world, &SilentProgress::new())
        .unwrap();

    assert_eq!(snapshot(&server.layout.live_world), expected);
}

#[test]
fn test_name_taken_mid_write_moves_to_next_suffix() {
    let server = TestServer::new();
    server.live_world("Core Craft", &[], &[]);
    let squatted = server.layout.backup_dir.join("Core_Craft_Mar05_2024.mcworld");
    let progress = ClaimsPathMidWrite::new(squatted.clone());

    let backups = BackupManager::from_layout(&server.layout);
    let archive = backups
        .create_on(&server.layout.live_world, day(), &progress)
        .unwrap();

    assert_eq!(archive.file_name(), "Core_Craft_Mar05_2024a.mcworld");
    assert_eq!(fs::read(&squatted).unwrap(), b"written elsewhere");
    assert!(archive.path.is_file());
}

#[test]
fn test_uppercase_extension_counts_as_taken() {
    let server = TestServer::new();
    server.live_world("Core Craft", &[], &[]);
    fs::create_dir_all(&server.layout.backup_dir).unwrap();
    fs::write(server.layout.backup_dir.join("Core_Craft_Mar05_2024.MCWORLD"), b"old").unwrap();

    let backups = BackupManager::from_layout(&server.layout);
    let archive = backups
        .create_on(&server.layout.live_world, day(), &SilentProgress::new())
        .unwrap();

    assert_eq!(archive.file_name(), "Core_Craft_Mar05_2024a.mcworld");
    assert_eq!(backups.list().unwrap().len(), 2);
}
