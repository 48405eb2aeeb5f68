use clap::Parser;
use fuse_sys::*;
use gpgfs::Gpgfs;
use std::fs;
use std::process::ExitCode;

/// Mount an encrypted, GPG-backed virtual filesystem.
#[derive(Parser)]
#[command(name = "gpgfs", about = "mount an encrypted virtual filesystem")]
struct Args {
    /// GPG key id (or any identifier the recipient-key engine accepts)
    keyid: String,

    /// Directory holding the encrypted index and per-file blobs
    encrypted_root: String,

    /// Path to mount the filesystem at
    mountpoint: String,
}

const USAGE: &str = "usage: gpgfs <keyid> <encrypted_root> <mountpoint>\n";

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprint!("{USAGE}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = fs::create_dir_all(&args.encrypted_root) {
        log::error!("failed to create {}: {err}", args.encrypted_root);
        return ExitCode::from(1);
    }

    let mut fs = match Gpgfs::new(args.keyid, args.encrypted_root) {
        Ok(fs) => fs,
        Err(err) => {
            log::error!("failed to mount: {err}");
            return ExitCode::from(1);
        }
    };

    let exec = std::env::args().next().unwrap_or_else(|| "gpgfs".to_string());
    let fuse_args = [exec.as_str(), args.mountpoint.as_str()];
    match fs.run(&fuse_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("unexpected FUSE error: {err}");
            ExitCode::from(1)
        }
    }
}
