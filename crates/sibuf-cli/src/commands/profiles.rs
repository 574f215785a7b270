//! Relay profile management commands.
//!
//! Provides commands to list, show, and export relay profiles.

use clap::{Args, Subcommand};
use sibuf_config::{
    RelayProfile, ensure_user_profiles_dir, factory_profiles, get_factory_profile,
    list_user_profiles, profile_name_from_path, user_config_dir, user_profiles_dir,
};
use std::path::PathBuf;

use super::common::load_profile;

#[derive(Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    command: ProfilesCommand,
}

#[derive(Subcommand)]
enum ProfilesCommand {
    /// List available profiles (factory and user)
    List {
        /// Show only factory profiles
        #[arg(long)]
        factory: bool,

        /// Show only user profiles
        #[arg(long)]
        user: bool,
    },

    /// Show details of a profile
    Show {
        /// Profile name or path
        name: String,

        /// Print the profile as TOML
        #[arg(long)]
        toml: bool,
    },

    /// Write a profile to a TOML file for customization
    Export {
        /// Profile name or path
        name: String,

        /// Output file (defaults to the user profile directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show profile directories
    Paths,
}

pub fn run(args: ProfilesArgs) -> anyhow::Result<()> {
    match args.command {
        ProfilesCommand::List { factory, user } => list_profiles(factory, user),
        ProfilesCommand::Show { name, toml } => show_profile(&name, toml),
        ProfilesCommand::Export {
            name,
            output,
            force,
        } => export_profile(&name, output, force),
        ProfilesCommand::Paths => show_paths(),
    }
}

fn list_profiles(factory_only: bool, user_only: bool) -> anyhow::Result<()> {
    let show_factory = !user_only;
    let show_user = !factory_only;

    if show_factory {
        println!("Factory Profiles:");
        println!("=================");
        for profile in factory_profiles()? {
            let desc = profile.description.as_deref().unwrap_or("");
            println!("  {:20} - {}", profile.name, desc);
        }
        println!();
    }

    if show_user {
        println!("User Profiles:");
        println!("==============");
        let user_profiles = list_user_profiles();
        if user_profiles.is_empty() {
            println!("  (none)");
            println!();
            println!("  Create one with: sibuf profiles export srr --output <file>\n");
        } else {
            for path in user_profiles {
                let name = profile_name_from_path(&path).unwrap_or_else(|| "unknown".into());
                match RelayProfile::load(&path) {
                    Ok(profile) => {
                        let desc = profile.description.as_deref().unwrap_or("");
                        println!("  {:20} - {}", name, desc);
                    }
                    Err(_) => {
                        println!("  {:20} - (error loading)", name);
                    }
                }
            }
        }
        println!();
    }

    Ok(())
}

fn show_profile(name: &str, as_toml: bool) -> anyhow::Result<()> {
    let profile = load_profile(name)?;

    if as_toml {
        print!("{}", profile.to_toml()?);
        return Ok(());
    }

    let config = profile.engine_config()?;
    let line = profile.line_settings()?;

    println!("Profile: {}", profile.name);
    println!("{}", "=".repeat(9 + profile.name.len()));
    println!();

    if let Some(desc) = &profile.description {
        println!("Description: {}", desc);
        println!();
    }

    println!("Channels:    {}", config.channels);
    println!("Arbitration: {}", profile.policy().name());
    println!("Overflow:    {:?}", config.overflow);
    println!(
        "Queues:      rx {} / tx {} bytes per channel",
        config.rx_capacity, config.tx_capacity
    );
    println!();

    let format = &config.format;
    match format.preamble {
        Some(preamble) => println!(
            "Record:      {:02X} {:02X} LEN payload +{} trailer",
            preamble, format.header, format.trailer_len
        ),
        None => println!(
            "Record:      {:02X} LEN payload +{} trailer",
            format.header, format.trailer_len
        ),
    }
    println!(
        "Line:        {} ({} bytes/s, CTS {})",
        line,
        line.bytes_per_second(),
        if line.flow.cts { "on" } else { "off" }
    );

    Ok(())
}

fn export_profile(name: &str, output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let profile = load_profile(name)?;

    let path = match output {
        Some(path) => path,
        None => ensure_user_profiles_dir()?.join(format!("{}.toml", profile.name)),
    };

    if path.exists() && !force {
        anyhow::bail!(
            "'{}' already exists. Use --force to overwrite.",
            path.display()
        );
    }

    profile.save(&path)?;

    let origin = if get_factory_profile(name)?.is_some() {
        "factory profile"
    } else {
        "profile"
    };
    println!("Exported {} '{}' to {}", origin, profile.name, path.display());
    Ok(())
}

fn show_paths() -> anyhow::Result<()> {
    println!("Profile Directories:");
    println!("====================");
    println!();
    println!("User profiles: {}", user_profiles_dir().display());
    println!("Config dir:    {}", user_config_dir().display());

    Ok(())
}
