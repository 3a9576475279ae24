//! tlsforge CLI application.
//!
//! This binary issues the certificates described by a TOML configuration and
//! verifies leaf certificates against authority certificates.

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tlsforge::cert::ca::create_authority;
use tlsforge::cert::entity::{create_leaf, create_leaf_from_pem};
use tlsforge::cert::verify::verify;
use tlsforge::cert::x509_signing::Authority;
use tlsforge::clock::SystemClock;
use tlsforge::config::{Config, DEFAULT_CONFIG_PATH};
use tlsforge::error::Result;
use tlsforge::storage::material::{read_material, write_material};

#[derive(Parser)]
#[command(name = "tlsforge")]
#[command(about = "tlsforge: issue and verify Ed25519 X.509 certificates", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Certificate creation operations
    #[command(subcommand)]
    Create(CreateCommands),

    /// Verify a leaf certificate against authority certificates
    Verify {
        /// Leaf certificate file
        #[arg(long)]
        cert: PathBuf,

        /// Authority certificate file (may hold several certificates)
        #[arg(long)]
        ca_cert: PathBuf,
    },
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Create the certificate authority
    Ca {
        /// Output file for the private key
        #[arg(long, default_value = "ca.key")]
        key_out: PathBuf,

        /// Output file for the certificate
        #[arg(long, default_value = "ca.crt")]
        cert_out: PathBuf,
    },

    /// Create one configured leaf certificate
    Cert {
        /// Name of the certificate in the configuration
        #[arg(long)]
        name: String,

        /// Output file for the private key (default: NAME.key)
        #[arg(long)]
        key_out: Option<PathBuf>,

        /// Output file for the certificate (default: NAME.crt)
        #[arg(long)]
        cert_out: Option<PathBuf>,

        /// Authority private key file
        #[arg(long, default_value = "ca.key")]
        ca_key: PathBuf,

        /// Authority certificate file
        #[arg(long, default_value = "ca.crt")]
        ca_cert: PathBuf,
    },

    /// Create the certificate authority and every configured leaf
    All {
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create(create_cmd) => handle_create_command(create_cmd, &cli.config),
        Commands::Verify { cert, ca_cert } => handle_verify_command(&cert, &ca_cert),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn handle_create_command(cmd: CreateCommands, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    log::debug!("Loaded configuration from {}", config.path.display());

    match cmd {
        CreateCommands::Ca { key_out, cert_out } => {
            let material = create_authority(&config.ca_cert, &SystemClock)?;
            write_material(&material, &key_out, &cert_out)?;

            println!("✓ Created certificate authority: {}", cert_out.display());
            println!("  Subject: {}", config.ca_cert.label());
            println!("  Key: {}", key_out.display());
            println!("  Valid for: {} years", config.ca_cert.valid_for_years);

            Ok(())
        }

        CreateCommands::Cert {
            name,
            key_out,
            cert_out,
            ca_key,
            ca_cert,
        } => {
            let spec = config.leaf(&name)?;
            let key_out = key_out.unwrap_or_else(|| PathBuf::from(format!("{}.key", name)));
            let cert_out = cert_out.unwrap_or_else(|| PathBuf::from(format!("{}.crt", name)));

            let ca_key_pem = read_material(&ca_key)?;
            let ca_cert_pem = read_material(&ca_cert)?;

            let material = create_leaf_from_pem(spec, &ca_key_pem, &ca_cert_pem, &SystemClock)?;
            write_material(&material, &key_out, &cert_out)?;

            println!("✓ Created certificate {}: {}", name, cert_out.display());
            println!("  Subject: {}", spec.label());
            println!("  Key: {}", key_out.display());
            println!("  Valid for: {} years", spec.valid_for_years);

            Ok(())
        }

        CreateCommands::All { out_dir } => {
            fs::create_dir_all(&out_dir)?;

            // The authority must exist before any leaf is signed.
            let ca_material = create_authority(&config.ca_cert, &SystemClock)?;
            write_material(
                &ca_material,
                &out_dir.join("ca.key"),
                &out_dir.join("ca.crt"),
            )?;
            println!(
                "✓ Created certificate authority: {}",
                out_dir.join("ca.crt").display()
            );

            let authority = Authority::from_pem(
                ca_material.private_key.as_bytes(),
                ca_material.certificate.as_bytes(),
            )?;

            let results: Vec<Result<PathBuf>> = config
                .certs
                .par_iter()
                .map(|(name, spec)| {
                    let material = create_leaf(spec, &authority, &SystemClock)?;
                    let cert_out = out_dir.join(format!("{}.crt", name));
                    write_material(&material, &out_dir.join(format!("{}.key", name)), &cert_out)?;
                    Ok(cert_out)
                })
                .collect();

            let mut first_error = None;
            for result in results {
                match result {
                    Ok(cert_out) => println!("✓ Created certificate: {}", cert_out.display()),
                    Err(e) => {
                        log::error!("{}", e);
                        first_error.get_or_insert(e);
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }
}

fn handle_verify_command(cert: &Path, ca_cert: &Path) -> Result<()> {
    let leaf_pem = read_material(cert)?;
    let ca_pem = read_material(ca_cert)?;

    let verification = verify(&leaf_pem, &ca_pem)?;

    println!("✓ Certificate verified: {}", cert.display());
    for (chain, path) in verification.paths.iter().enumerate() {
        for (position, entry) in path.certificates.iter().enumerate() {
            println!(
                "  Chain {} Certificate {}: Subject: {}, Issuer: {}",
                chain, position, entry.subject, entry.issuer
            );
        }
    }

    Ok(())
}
