// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NexBlue Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Command line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nexblue")]
#[command(author, version, about = "NexBlue EV charger cloud bridge")]
#[command(
    long_about = "Polls NexBlue chargers through the NexBlue cloud API and exposes their\n\
    state as sensors, binary sensors, a charging switch and a current-limit number.\n\
    \nExamples:\n  \
    nexblue run                          # Poll until Ctrl-C\n  \
    nexblue status                       # Print every entity once\n  \
    nexblue set-current NB123456 16      # Limit charging to 16 A"
)]
pub struct Cli {
    /// Configuration file (TOML or JSON, chosen by extension)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll chargers on the configured interval until interrupted
    Run,

    /// Poll once and print the state of every entity
    Status,

    /// Start charging
    Start {
        /// Charger serial number
        serial: String,
    },

    /// Stop charging
    Stop {
        /// Charger serial number
        serial: String,
    },

    /// Set the charging current limit
    SetCurrent {
        /// Charger serial number
        serial: String,

        /// Current limit in amps (6-32)
        amps: u32,
    },
}

impl Cli {
    /// `run` when no subcommand was given
    pub fn command_or_default(&self) -> &Commands {
        static DEFAULT_COMMAND: Commands = Commands::Run;
        self.command.as_ref().unwrap_or(&DEFAULT_COMMAND)
    }
}
