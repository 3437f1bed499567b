use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "roster",
    version,
    about = "contact roster curation tool",
    long_about = "Roster curates a contact/address list served by a small REST API: tag records into named groups, edit fields inline, and export grouped selections as clipboard text.\n\nExamples:\n  roster serve --data-file ./records.json\n  roster list --filter calle\n  roster toggle 5\n  roster group create \"Clients\"\n  roster export"
)]
pub struct CliArgs {
    #[arg(
        long = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to the YAML config file (default ~/.roster/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "api-url",
        value_name = "URL",
        help_heading = "Config",
        help = "Base URL of the record API."
    )]
    pub api_url: Option<String>,

    #[arg(
        long = "state-file",
        value_name = "FILE",
        help_heading = "Config",
        help = "Durable slot for selection/group state (default ~/.roster/state.json)."
    )]
    pub state_file: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout for API calls."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "tag-policy",
        value_name = "POLICY",
        help_heading = "Behavior",
        help = "Selection toggle behavior: multi-tag or single-tag."
    )]
    pub tag_policy: Option<String>,

    #[arg(
        long = "orphan-policy",
        value_name = "POLICY",
        help_heading = "Behavior",
        help = "Orphaned selections on group deletion: retag or drop."
    )]
    pub orphan_policy: Option<String>,

    #[arg(
        long = "export-scope",
        value_name = "SCOPE",
        help_heading = "Behavior",
        help = "Export scope: all-groups or active-group."
    )]
    pub export_scope: Option<String>,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the record API server over a flat JSON file.
    Serve {
        #[arg(
            long = "data-file",
            value_name = "FILE",
            help = "Backing JSON file of records (default ./records.json)."
        )]
        data_file: Option<String>,

        #[arg(
            short = 'p',
            long = "port",
            value_name = "PORT",
            help = "Port to listen on (default 3000, PORT env honored)."
        )]
        port: Option<u16>,
    },

    /// Fetch records and render the table with selection markers.
    List {
        #[arg(
            short = 'f',
            long = "filter",
            value_name = "TEXT",
            help = "Only show records whose name or address contains TEXT."
        )]
        filter: Option<String>,
    },

    /// Toggle a record in or out of the selection under the active group.
    Toggle {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Group lifecycle: create, rename, delete, move, use.
    #[command(subcommand)]
    Group(GroupCommand),

    /// Edit a record field locally and push the change to the API.
    Edit {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(value_name = "FIELD", help = "One of: name, address.")]
        field: String,

        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Show the selected records grouped by their tags.
    Show,

    /// Build the grouped export text and copy it to the clipboard.
    Export {
        #[arg(long = "stdout", help = "Print the export text instead of copying.")]
        stdout: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroupCommand {
    /// Create a group and make it active.
    Create {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Rename a group, rewriting its tags everywhere.
    Rename {
        #[arg(value_name = "OLD")]
        old: String,

        #[arg(value_name = "NEW")]
        new: String,
    },

    /// Delete a group (asks for confirmation unless --yes).
    Delete {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt.")]
        yes: bool,
    },

    /// Move a group to just before another group.
    Move {
        #[arg(value_name = "SOURCE")]
        source: String,

        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Set the active group.
    Use {
        #[arg(value_name = "NAME")]
        name: String,
    },
}
