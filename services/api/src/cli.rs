use crate::generate::{
    run_classify, run_export_reference, run_generate, ClassifyArgs, ExportReferenceArgs,
    GenerateArgs,
};
use crate::server;
use asycuda_export::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ASYCUDA Export Generator",
    about = "Generate ASYCUDA export declarations from duty-free sales data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build, validate and write a declaration from a sales file
    Generate(GenerateArgs),
    /// Show how a single product description would be classified
    Classify(ClassifyArgs),
    /// Rewrite a reference table as normalized declaration-layout CSV
    ExportReference(ExportReferenceArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Generate(args) => run_generate(args),
        Command::Classify(args) => run_classify(args),
        Command::ExportReference(args) => run_export_reference(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asycuda_export::workflows::encoders::OutputFormat;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["asycuda-export-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn generate_collects_settings_and_formats() {
        let cli = Cli::try_parse_from([
            "asycuda-export-api",
            "generate",
            "--sales",
            "sales.csv",
            "--exporter-id",
            "EXP001",
            "--exporter-name",
            "Island Duty Free Ltd",
            "--exporter-address",
            "1 Rodney Bay Marina",
            "--exporter-city",
            "Gros Islet",
            "--exporter-country",
            "LC",
            "--set",
            "customs_office=LCCAP",
            "--set",
            "destination_country=US",
            "--format",
            "xml",
            "--format",
            "txt",
            "--date",
            "2025-10-01",
        ])
        .expect("parses");

        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            args.settings,
            vec![
                ("customs_office".to_string(), "LCCAP".to_string()),
                ("destination_country".to_string(), "US".to_string()),
            ]
        );
        assert_eq!(
            args.formats,
            vec![OutputFormat::Markup, OutputFormat::Delimited]
        );
        assert!(args.declarant.declarant_id.is_none());
    }

    #[test]
    fn malformed_setting_is_rejected() {
        let result = Cli::try_parse_from([
            "asycuda-export-api",
            "generate",
            "--sales",
            "sales.csv",
            "--exporter-id",
            "EXP001",
            "--exporter-name",
            "Island Duty Free Ltd",
            "--exporter-address",
            "1 Rodney Bay Marina",
            "--set",
            "customs_office",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn classify_takes_a_positional_description() {
        let cli = Cli::try_parse_from([
            "asycuda-export-api",
            "classify",
            "LADIES STRAW HAT",
            "--quantity",
            "3",
        ])
        .expect("parses");
        let Some(Command::Classify(args)) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.description, "LADIES STRAW HAT");
        assert_eq!(args.quantity, 3.0);
    }

    #[test]
    fn export_reference_requires_a_destination() {
        let cli = Cli::try_parse_from([
            "asycuda-export-api",
            "export-reference",
            "--reference",
            "reference.xlsx",
            "--out",
            "reference.csv",
        ])
        .expect("parses");
        let Some(Command::ExportReference(args)) = cli.command else {
            panic!("expected export-reference");
        };
        assert_eq!(args.out, std::path::PathBuf::from("reference.csv"));

        assert!(Cli::try_parse_from(["asycuda-export-api", "export-reference"]).is_err());
    }
}
