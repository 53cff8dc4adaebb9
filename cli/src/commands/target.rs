//! `droplet target [<domain>]`: show or set the cluster and droplet store.

use anyhow::{Context, Result, anyhow};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{BlobStoreVerifier, ConfigStore};
use crate::domain::config::{DEFAULT_S3_REGION, validate_s3_config};
use crate::domain::{BlobStoreConfig, DropletConfig, S3Config};

/// Arguments for the target command.
#[derive(Args)]
pub struct TargetArgs {
    /// Cluster domain (e.g. 192.168.11.11.xip.io); omit to show the current target
    pub target: Option<String>,

    /// Print only the targeted domain
    #[arg(short, long, conflicts_with = "target")]
    pub domain: bool,

    /// Use an S3 bucket as the droplet store
    #[arg(long)]
    pub s3: bool,

    /// S3 access key (prompted when omitted)
    #[arg(long, requires = "s3")]
    pub access_key: Option<String>,

    /// S3 secret key (prompted when omitted)
    #[arg(long, requires = "s3", env = "DROPLET_S3_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// S3 bucket (prompted when omitted)
    #[arg(long, requires = "s3")]
    pub bucket: Option<String>,

    /// S3 region
    #[arg(long, requires = "s3")]
    pub region: Option<String>,

    /// Cluster login
    #[arg(long)]
    pub username: Option<String>,

    /// Cluster password
    #[arg(long, env = "DROPLET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Run `droplet target`.
///
/// # Errors
///
/// Returns an error if the droplet store cannot be reached or rejects the
/// credentials (nothing is saved), or the config file cannot be written.
pub async fn run(app: &AppContext, args: TargetArgs, verifier: &impl BlobStoreVerifier) -> Result<()> {
    let mut config = app.load_config()?;

    let Some(target) = args.target.clone() else {
        if args.domain {
            if !config.target.is_empty() {
                println!("{}", config.target);
            }
        } else {
            for (key, value) in describe(&config) {
                app.output.kv(key, &value);
            }
        }
        return Ok(());
    };

    config.target = target;
    config.username = args.username.clone().unwrap_or_default();
    config.password = args.password.clone().unwrap_or_default();

    if args.s3 {
        let s3 = s3_settings(app, &args)?;
        validate_s3_config(&s3)?;
        config.use_s3_blob_store(s3);
    } else {
        config.use_dav_blob_store();
    }

    let store = config
        .blob_store
        .as_ref()
        .ok_or_else(|| anyhow!("no droplet store configured"))?;
    let authorized = verifier
        .verify(store)
        .await
        .context("Could not connect to the droplet store.")?;
    if !authorized {
        anyhow::bail!("Could not authenticate with the droplet store.");
    }

    app.config_store.save(&config)?;
    app.output.success("API location set.");
    Ok(())
}

fn s3_settings(app: &AppContext, args: &TargetArgs) -> Result<S3Config> {
    let or_prompt = |value: &Option<String>, prompt: &str| match value {
        Some(v) => Ok(v.clone()),
        None => app.prompt(prompt),
    };
    let secret_key = match &args.secret_key {
        Some(v) => v.clone(),
        None => app.prompt_password("S3 Secret Key")?,
    };
    let region = args
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_S3_REGION.to_string());
    Ok(S3Config {
        access_key: or_prompt(&args.access_key, "S3 Access Key")?,
        secret_key,
        bucket_name: or_prompt(&args.bucket, "S3 Bucket")?,
        region,
    })
}

/// Key/value lines describing the current target. Secrets are never shown.
#[must_use]
pub fn describe(config: &DropletConfig) -> Vec<(&'static str, String)> {
    if config.target.is_empty() {
        return vec![("Target:", "not set".to_string())];
    }
    let target = if config.username.is_empty() {
        config.target.clone()
    } else {
        format!("{}@{}", config.username, config.target)
    };
    let store = match &config.blob_store {
        None => "not specified".to_string(),
        Some(BlobStoreConfig::S3(s3)) => format!("s3://{} ({})", s3.bucket_name, s3.region),
        Some(BlobStoreConfig::Dav(dav)) if dav.username.is_empty() => {
            format!("{}:{}", dav.host, dav.port)
        }
        Some(BlobStoreConfig::Dav(dav)) => format!("{}@{}:{}", dav.username, dav.host, dav.port),
    };
    vec![("Target:", target), ("Droplet store:", store)]
}
