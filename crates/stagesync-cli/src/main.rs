//! `stagesync`: command-line client for the stagesync admissions pipeline.
//!
//! # Usage
//!
//! ```
//! stagesync classify facts.json
//! stagesync --url http://localhost:8080 --user ops --password secret ingest facts.json
//! stagesync --config ~/.config/stagesync/config.toml updates
//! ```

mod client;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use stagesync_core::{classify::classify_facts, fact::RawChecklistFact};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "stagesync", about = "Classify admissions checklist facts into CRM stages")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the stagesync server (default: http://localhost:8080).
  #[arg(long, env = "STAGESYNC_URL", global = true)]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "STAGESYNC_USER", global = true)]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "STAGESYNC_PASSWORD", global = true, hide_env_values = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Classify a JSON array of facts locally; nothing is sent anywhere.
  Classify {
    file: PathBuf,
    /// Print the full view and breakdown for each person as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Upload a JSON array of facts to the server.
  Ingest {
    file: PathBuf,
    /// Reclassify every person in the file after uploading.
    #[arg(long)]
    reclassify: bool,
  },
  /// Show a person's aggregated view and live breakdown.
  Show {
    person_id: u64,
    #[arg(long)]
    json: bool,
  },
  /// Re-derive and persist a person's verdict.
  Reclassify { person_id: u64 },
  /// List pending stage updates.
  Updates {
    #[arg(long, default_value_t = 100)]
    limit: usize,
  },
  /// Mark a stage update as delivered.
  Ack { update_id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug, PartialEq)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

const DEFAULT_URL: &str = "http://localhost:8080";

/// CLI flags and env override the config file, which overrides defaults.
fn resolve_api_config(args: &Args, file_cfg: ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, file: String| {
    flag.clone().or_else(|| (!file.is_empty()).then_some(file))
  };
  ApiConfig {
    base_url: pick(&args.url, file_cfg.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: pick(&args.user, file_cfg.username).unwrap_or_default(),
    password: pick(&args.password, file_cfg.password).unwrap_or_default(),
  }
}

fn load_config_file(path: Option<&Path>) -> Result<ConfigFile> {
  let Some(path) = path else {
    return Ok(ConfigFile::default());
  };
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading config file {}", path.display()))?;
  toml::from_str(&raw).context("parsing config file")
}

fn read_facts(path: &Path) -> Result<Vec<RawChecklistFact>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading facts file {}", path.display()))?;
  let facts: Vec<RawChecklistFact> = serde_json::from_str(&raw)
    .with_context(|| format!("parsing {} as a JSON array of facts", path.display()))?;
  tracing::debug!(count = facts.len(), path = %path.display(), "facts loaded");
  Ok(facts)
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let connect = || -> Result<ApiClient> {
    let file_cfg = load_config_file(args.config.as_deref())?;
    ApiClient::new(resolve_api_config(&args, file_cfg))
  };

  match &args.command {
    Command::Classify { file, json } => {
      let people = classify_facts(read_facts(file)?);
      if *json {
        println!("{}", serde_json::to_string_pretty(&people)?);
      } else {
        for p in &people {
          println!("{}", render::verdict_line(p.person_id, &p.breakdown));
        }
      }
    }
    Command::Ingest { file, reclassify } => {
      let client = connect()?;
      let facts = read_facts(file)?;
      let mut people: Vec<u64> = facts.iter().filter_map(|f| f.person_id).collect();
      people.sort_unstable();
      people.dedup();

      let stored = client.ingest(&facts).await?;
      println!("stored {stored} of {} facts", facts.len());

      if *reclassify {
        for person_id in people {
          let r = client.reclassify(person_id).await?;
          let marker = if r.update.is_some() { "  (changed)" } else { "" };
          println!("{}{marker}", render::verdict_line(person_id, &r.breakdown));
        }
      }
    }
    Command::Show { person_id, json } => {
      let client = connect()?;
      let view = client.view(*person_id).await?;
      let breakdown = client.breakdown(*person_id).await?;
      if *json {
        let out = serde_json::json!({ "view": view, "breakdown": breakdown });
        println!("{}", serde_json::to_string_pretty(&out)?);
      } else {
        print!("{}", render::person_detail(&view, &breakdown));
      }
    }
    Command::Reclassify { person_id } => {
      let r = connect()?.reclassify(*person_id).await?;
      println!("{}", render::verdict_line(*person_id, &r.breakdown));
      match r.update {
        Some(u) => println!("queued update {}", u.update_id),
        None => println!("unchanged"),
      }
    }
    Command::Updates { limit } => {
      for u in connect()?.updates(*limit).await? {
        println!("{}", render::update_line(&u));
      }
    }
    Command::Ack { update_id } => {
      if connect()?.ack(*update_id).await? {
        println!("acknowledged {update_id}");
      } else {
        anyhow::bail!("no pending update {update_id}");
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(extra: &[&str]) -> Args {
    let mut argv = vec!["stagesync"];
    argv.extend_from_slice(extra);
    argv.push("updates");
    Args::try_parse_from(argv).unwrap()
  }

  #[test]
  fn flags_override_config_file() {
    let file = ConfigFile {
      url:      "http://file:1".into(),
      username: "file-user".into(),
      password: "file-pass".into(),
    };
    let cfg = resolve_api_config(&args(&["--url", "http://flag:2"]), file);
    assert_eq!(cfg.base_url, "http://flag:2");
    assert_eq!(cfg.username, "file-user");
    assert_eq!(cfg.password, "file-pass");
  }

  #[test]
  fn defaults_when_nothing_set() {
    let a = Args {
      config:   None,
      url:      None,
      user:     None,
      password: None,
      command:  Command::Updates { limit: 1 },
    };
    let cfg = resolve_api_config(&a, ConfigFile::default());
    assert_eq!(cfg.base_url, DEFAULT_URL);
    assert!(cfg.username.is_empty());
  }

  #[test]
  fn config_file_parses_partial_toml() {
    let cfg: ConfigFile = toml::from_str(r#"url = "http://x:9""#).unwrap();
    assert_eq!(cfg, ConfigFile { url: "http://x:9".into(), ..ConfigFile::default() });
  }

  #[test]
  fn classify_subcommand_parses() {
    let a = Args::try_parse_from(["stagesync", "classify", "facts.json", "--json"]).unwrap();
    assert!(matches!(a.command, Command::Classify { json: true, .. }));
  }
}
