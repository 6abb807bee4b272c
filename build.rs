// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: staged world number
fn world_arg(help: &'static str) -> Arg {
    Arg::new("world")
        .long("world")
        .value_name("N")
        .value_parser(clap::value_parser!(usize))
        .help(help)
}

fn build_cli() -> Command {
    Command::new("worldpack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deploy add-on packs into a Bedrock world and keep dated backups")
        .subcommand_required(false)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value(".")
                .help("Server root directory"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Layout file (default: <root>/worldpack.toml when present)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output"),
        )
        .subcommand(
            Command::new("setup")
                .about("Select a world, resolve its required packs and deploy them")
                .arg(world_arg("Import staged world N (as numbered by `worlds`)"))
                .arg(
                    Arg::new("existing")
                        .long("existing")
                        .action(ArgAction::SetTrue)
                        .help("Keep the world already in the live directory"),
                )
                .arg(
                    Arg::new("all_packs")
                        .long("all-packs")
                        .action(ArgAction::SetTrue)
                        .help("Deploy every pack in the pool, not only the ones the world lists"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would change without touching anything"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check that the pool satisfies a world's pack requirements")
                .arg(world_arg("Check staged world N instead of the live world")),
        )
        .subcommand(Command::new("packs").about("List the packs available in the pool"))
        .subcommand(Command::new("worlds").about("List staged worlds available for import"))
        .subcommand(Command::new("backup").about("Back up the live world"))
        .subcommand(Command::new("backups").about("List existing backups, newest first"))
        .subcommand(
            Command::new("restore")
                .about("Replace the live world with a backup (stop the server first)")
                .arg(
                    Arg::new("backup")
                        .required(true)
                        .help("Backup file name in the backup directory, or a path"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("worldpack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
