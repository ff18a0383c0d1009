use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};
use keycard_identity::{
    build_snapshot, Card, CardRequest, CardScope, Context, IdentityType, TrustStoreConfig,
    Verdict, VerifierPolicy,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod keyfile;

use keyfile::{read_json, write_json, KeyFile};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Key pair management
    #[clap(subcommand)]
    Key(KeyCommands),

    /// Card requests, signing and validation
    #[clap(subcommand)]
    Card(CardCommands),

    /// Identity validation tokens
    #[clap(subcommand)]
    Token(TokenCommands),
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generate a new key pair
    Generate {
        /// Output file for the key pair
        #[clap(long, short)]
        output: PathBuf,

        /// Seal the private key with this password
        #[clap(long)]
        password: Option<String>,
    },

    /// Print the key id and public key of a key file
    Show {
        /// Key pair file
        #[clap(long, short)]
        key: PathBuf,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Create a self-signed card request
    Create {
        /// Identity value, e.g. an email address
        #[clap(long)]
        identity: String,

        /// Identity type (email, phone, application or any custom label)
        #[clap(long, default_value = "email")]
        identity_type: String,

        /// Card scope (application or global)
        #[clap(long, default_value = "application")]
        scope: String,

        /// Extra card data as key=value, may be repeated
        #[clap(long = "data", value_name = "KEY=VALUE")]
        data: Vec<String>,

        /// Owner key pair file
        #[clap(long, short)]
        key: PathBuf,

        /// Password for a sealed key
        #[clap(long)]
        password: Option<String>,

        /// Output file for the request
        #[clap(long, short)]
        output: PathBuf,
    },

    /// Add an authority signature to a request in place
    Sign {
        /// Request file
        #[clap(long, short)]
        request: PathBuf,

        /// Verifier id the signature is filed under
        #[clap(long)]
        authority_id: String,

        /// Authority key pair file
        #[clap(long, short)]
        key: PathBuf,

        /// Password for a sealed key
        #[clap(long)]
        password: Option<String>,
    },

    /// Turn a signed request into a card
    Finish {
        /// Request file
        #[clap(long, short)]
        request: PathBuf,

        /// Output file for the card
        #[clap(long, short)]
        output: PathBuf,
    },

    /// Validate one or more cards
    Verify {
        /// Card files
        #[clap(required = true)]
        cards: Vec<PathBuf>,

        /// Trust store configuration (TOML)
        #[clap(long, short)]
        trust: Option<PathBuf>,

        /// Require a signature from every registered verifier
        #[clap(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Issue a validation token for an identity
    Generate {
        #[clap(long, default_value = "email")]
        identity_type: String,

        #[clap(long)]
        identity_value: String,

        /// Authority key pair file
        #[clap(long, short)]
        key: PathBuf,

        /// Password for a sealed key
        #[clap(long)]
        password: Option<String>,
    },

    /// Check a validation token against an identity
    Verify {
        #[clap(long)]
        token: String,

        #[clap(long, default_value = "email")]
        identity_type: String,

        #[clap(long)]
        identity_value: String,

        /// Authority key pair file holding the public key
        #[clap(long, short)]
        key: PathBuf,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::ed25519();

    match &cli.command {
        Commands::Key(cmd) => match cmd {
            KeyCommands::Generate { output, password } => {
                generate_key(&ctx, output, password.as_deref())?;
            }
            KeyCommands::Show { key } => {
                let key_file: KeyFile = read_json(key, "key pair")?;
                let public = key_file.public_key(ctx.crypto())?;
                println!("key_id: {}", public.id());
                println!("public_key: {}", key_file.public_key);
                println!("sealed: {}", key_file.sealed);
            }
        },
        Commands::Card(cmd) => match cmd {
            CardCommands::Create {
                identity,
                identity_type,
                scope,
                data,
                key,
                password,
                output,
            } => {
                create_request(
                    &ctx,
                    identity,
                    identity_type,
                    scope,
                    data,
                    key,
                    password.as_deref(),
                    output,
                )?;
            }
            CardCommands::Sign {
                request,
                authority_id,
                key,
                password,
            } => {
                sign_request(&ctx, request, authority_id, key, password.as_deref())?;
            }
            CardCommands::Finish { request, output } => {
                let request: CardRequest = read_json(request, "card request")?;
                let card = request
                    .build(ctx.crypto())
                    .context("Failed to build card")?;
                write_json(output, &card, "card")?;
                println!("{}", card.id());
            }
            CardCommands::Verify {
                cards,
                trust,
                strict,
            } => {
                verify_cards(&ctx, cards, trust.as_deref(), *strict)?;
            }
        },
        Commands::Token(cmd) => match cmd {
            TokenCommands::Generate {
                identity_type,
                identity_value,
                key,
                password,
            } => {
                let key_file: KeyFile = read_json(key, "key pair")?;
                let private = key_file.private_key(ctx.crypto(), password.as_deref())?;
                let token = ctx
                    .token_generator()
                    .generate(identity_type, identity_value, &private)
                    .context("Failed to issue token")?;
                println!("{}", token);
            }
            TokenCommands::Verify {
                token,
                identity_type,
                identity_value,
                key,
            } => {
                let key_file: KeyFile = read_json(key, "key pair")?;
                let public = key_file.public_key(ctx.crypto())?;
                let ok = ctx
                    .token_generator()
                    .verify(token, identity_type, identity_value, &public)
                    .context("Failed to check token")?;
                if !ok {
                    bail!("Token is not valid for {} '{}'", identity_type, identity_value);
                }
                println!("valid");
            }
        },
    }

    Ok(())
}

fn generate_key(ctx: &Context, output: &Path, password: Option<&str>) -> Result<()> {
    let key_pair = ctx
        .crypto()
        .generate_key_pair()
        .context("Failed to generate key pair")?;
    let key_file = KeyFile::new(ctx.crypto(), &key_pair, password)?;
    write_json(output, &key_file, "key pair")?;
    info!(key_id = %key_pair.public.id(), "Generated key pair");
    println!("{}", key_file.key_id);
    Ok(())
}

fn parse_data(entries: &[String]) -> Result<BTreeMap<String, String>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Card data '{}' is not in KEY=VALUE form", entry))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn create_request(
    ctx: &Context,
    identity: &str,
    identity_type: &str,
    scope: &str,
    data: &[String],
    key: &Path,
    password: Option<&str>,
    output: &Path,
) -> Result<()> {
    let identity_type: IdentityType = identity_type.parse()?;
    let scope: CardScope = scope.parse()?;
    let key_file: KeyFile = read_json(key, "key pair")?;
    let private = key_file.private_key(ctx.crypto(), password)?;

    let snapshot = build_snapshot(
        identity,
        identity_type,
        &key_file.public_key_der()?,
        scope,
        parse_data(data)?,
    )?;
    let mut request = CardRequest::new(snapshot);
    let signer_id = ctx
        .request_signer()
        .self_sign(&mut request, &private)
        .context("Failed to self-sign request")?;
    write_json(output, &request, "card request")?;
    println!("{}", signer_id);
    Ok(())
}

fn sign_request(
    ctx: &Context,
    path: &Path,
    authority_id: &str,
    key: &Path,
    password: Option<&str>,
) -> Result<()> {
    let mut request: CardRequest = read_json(path, "card request")?;
    let key_file: KeyFile = read_json(key, "key pair")?;
    let private = key_file.private_key(ctx.crypto(), password)?;
    ctx.request_signer()
        .authority_sign(&mut request, authority_id, &private)
        .with_context(|| format!("Failed to sign request as '{}'", authority_id))?;
    write_json(path, &request, "card request")?;
    info!(authority_id, "Added authority signature");
    Ok(())
}

fn verify_cards(
    ctx: &Context,
    paths: &[PathBuf],
    trust: Option<&Path>,
    strict: bool,
) -> Result<()> {
    if let Some(trust) = trust {
        let config = TrustStoreConfig::from_file(trust)?;
        config.apply(ctx.trust_store(), ctx.crypto())?;
        info!(verifiers = config.verifiers.len(), "Loaded trust store");
    }

    let cards = paths
        .iter()
        .map(|path| read_json::<Card>(path, "card"))
        .collect::<Result<Vec<_>>>()?;
    let policy = if strict {
        VerifierPolicy::Strict
    } else {
        VerifierPolicy::Lenient
    };
    let report = ctx.card_validator(policy).validate_all(&cards)?;

    for (path, result) in paths.iter().zip(report.results()) {
        match &result.verdict {
            Verdict::Valid => println!("{}: valid", path.display()),
            Verdict::LegacyAccepted => println!("{}: valid (legacy)", path.display()),
            Verdict::Invalid(failures) => {
                println!("{}: invalid", path.display());
                for failure in failures {
                    println!("  - {}", failure);
                }
            }
        }
    }

    if !report.all_valid() {
        bail!("{}", report);
    }
    println!("{} cards are valid", report.total());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    #[test]
    fn test_parse_data_entries() {
        let data = parse_data(&["device=laptop".into(), "note=a=b".into()]).unwrap();
        assert_eq!(data["device"], "laptop");
        assert_eq!(data["note"], "a=b");
        assert!(parse_data(&["missing".into()]).is_err());
    }

    #[test]
    fn test_key_file_requires_password_when_sealed() {
        let ctx = Context::ed25519();
        let key_pair = ctx.crypto().generate_key_pair().unwrap();
        let key_file = KeyFile::new(ctx.crypto(), &key_pair, Some("hunter2")).unwrap();
        assert!(key_file.sealed);
        assert!(key_file.private_key(ctx.crypto(), None).is_err());
        let private = key_file.private_key(ctx.crypto(), Some("hunter2")).unwrap();
        assert_eq!(private.id(), key_pair.public.id());
        assert_eq!(
            STANDARD.decode(&key_file.public_key).unwrap(),
            ctx.crypto().export_public_key(&key_pair.public)
        );
    }
}
