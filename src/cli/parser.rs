use crate::export::ExportFormat;
use clap::{Args, Parser, Subcommand};

/// Command-line interface definition for rAttendance
/// GPS-anchored attendance tracking backed by SQLite
#[derive(Parser)]
#[command(
    name = "rattendance",
    version = env!("CARGO_PKG_VERSION"),
    about = "GPS attendance CLI: clock in/out, sessions and site visits with geofence and travel-speed checks",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Override the entity/department directory file
    #[arg(global = true, long = "directory")]
    pub directory: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who and where, shared by every attendance command.
#[derive(Args, Debug, Clone)]
pub struct Position {
    #[arg(long = "user", help = "Authenticated user id")]
    pub user: String,

    #[arg(long = "lat", allow_hyphen_values = true, help = "Latitude in decimal degrees")]
    pub lat: f64,

    #[arg(long = "lon", allow_hyphen_values = true, help = "Longitude in decimal degrees")]
    pub lon: f64,

    #[arg(long = "notes")]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/vim/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Start the working day
    ClockIn {
        #[command(flatten)]
        at: Position,

        #[arg(long = "mode", help = "Work location: office, remote or field")]
        mode: Option<String>,

        #[arg(long = "remote-location", help = "Free-text place for remote days")]
        remote_location: Option<String>,
    },

    /// End the working day (closes any open session or visit)
    ClockOut {
        #[command(flatten)]
        at: Position,
    },

    /// Start or end a session (work, break, lunch, meeting, errand)
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Start or end a visit to an authorized location
    Visit {
        #[command(subcommand)]
        action: VisitAction,
    },

    /// Show today's record, open session and open visit
    Status {
        #[arg(long = "user")]
        user: String,

        #[arg(long = "details", help = "Also list today's sessions and visits")]
        details: bool,
    },

    /// Find the nearest authorized location for a coordinate
    Locate {
        #[arg(long = "user")]
        user: String,

        #[arg(long = "lat", allow_hyphen_values = true)]
        lat: f64,

        #[arg(long = "lon", allow_hyphen_values = true)]
        lon: f64,
    },

    /// List daily records
    History {
        #[arg(long = "user")]
        user: String,

        #[arg(long, short, help = "Filter by year/month/day or a custom range")]
        period: Option<String>,
    },

    /// Aggregate days present, hours and flags
    Summary {
        #[arg(long = "user")]
        user: String,

        #[arg(long, short, help = "Filter by year/month/day or a custom range")]
        period: Option<String>,
    },

    /// List flagged records across days, sessions and visits
    Flagged {
        #[arg(long = "limit", help = "Maximum rows (default from config)")]
        limit: Option<usize>,
    },

    /// Flag a record for review
    Flag {
        #[arg(long = "type", help = "attendance, session or location_log")]
        record_type: String,

        #[arg(long = "id")]
        id: i64,

        #[arg(long = "reason")]
        reason: String,
    },

    /// Export a user's daily records
    Export {
        #[arg(long = "user")]
        user: String,

        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(
            long,
            value_name = "RANGE",
            help = "Filter export by year/month/day or a custom range"
        )]
        range: Option<String>,

        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    CheckIn {
        #[command(flatten)]
        at: Position,

        #[arg(long = "type", help = "work, break, lunch, meeting or errand")]
        session_type: Option<String>,
    },
    CheckOut {
        #[command(flatten)]
        at: Position,
    },
}

#[derive(Subcommand)]
pub enum VisitAction {
    CheckIn {
        #[command(flatten)]
        at: Position,

        #[arg(long = "entity", help = "Id of the authorized location")]
        entity: String,

        #[arg(long = "purpose")]
        purpose: Option<String>,
    },
    CheckOut {
        #[command(flatten)]
        at: Position,
    },
}
