use clap::{Arg, ArgAction, Command};
use listing2pdf::config::{self, ConfigSource, ReportConfig};
use listing2pdf::model::{ContactField, ContactInfo, ContentBlock};
use listing2pdf::{ReportError, ReportRequest};
use log::{debug, error, info};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Debug)]
enum AppError {
    ReportError(ReportError),
    PathError(String),
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // No output except errors
    Normal,  // Standard output
    Verbose, // Detailed output
}

/// Contact flags: field, argument id / long name, help text.
const CONTACT_ARGS: [(ContactField, &str, &str); 10] = [
    (ContactField::CompanyName, "company-name", "Company name shown in the footer"),
    (ContactField::AgentName, "agent-name", "Agent name shown in the footer"),
    (ContactField::Address, "address", "Office address; use \\n for line breaks"),
    (ContactField::Phone, "phone", "Phone number"),
    (ContactField::Email, "email", "E-mail address"),
    (ContactField::MapLink, "map-link", "Google Maps link"),
    (ContactField::WhatsappLink, "whatsapp-link", "WhatsApp link"),
    (ContactField::WebsiteLink, "website-link", "Website link"),
    (ContactField::TelegramLink, "telegram-link", "Telegram link"),
    (ContactField::InstagramLink, "instagram-link", "Instagram link"),
];

/// Find the configuration file to use.
///
/// Priority order:
/// 1. If `--config` is explicitly provided, use that file
/// 2. `listing2pdfrc.toml` in the current directory
/// 3. `listing2pdf/listing2pdfrc.toml` in the user config directory
/// 4. Otherwise `None`: built-in defaults
fn find_config_file(matches: &clap::ArgMatches) -> Option<String> {
    if let Some(config_file) = matches.get_one::<String>("config") {
        return Some(config_file.to_string());
    }
    config::config_search_paths()
        .into_iter()
        .find(|p| p.exists())
        .map(|p| p.display().to_string())
}

fn get_output_path(matches: &clap::ArgMatches, url: &str) -> Result<PathBuf, AppError> {
    let current_dir = std::env::current_dir().map_err(|e| AppError::PathError(e.to_string()))?;

    Ok(matches
        .get_one::<String>("output")
        .map(|p| current_dir.join(p))
        .unwrap_or_else(|| current_dir.join(listing2pdf::report_file_name(url))))
}

/// Contact details from the command line, completed from the configuration file.
fn get_contact(matches: &clap::ArgMatches, defaults: &ContactInfo) -> ContactInfo {
    let mut contact = ContactInfo::default();
    for (field, id, _) in CONTACT_ARGS {
        if let Some(value) = matches.get_one::<String>(id) {
            contact.set(field, value.replace("\\n", "\n"));
        }
    }
    contact.merge_missing(defaults);
    contact
}

fn build_request(matches: &clap::ArgMatches, url: &str, config: &ReportConfig) -> ReportRequest {
    let mut request = ReportRequest::new(url, config);
    if let Some(lang) = matches.get_one::<String>("lang") {
        request.target_language = lang.to_string();
    }
    if let Some(lang) = matches.get_one::<String>("source-lang") {
        request.source_language = lang.to_string();
    }
    if matches.get_flag("no-translate") {
        request.translate = false;
    }
    request.contact = get_contact(matches, &config.contact);
    request.logo = matches.get_one::<String>("logo").map(PathBuf::from);
    request
}

fn print_summary(blocks: &[ContentBlock], images: usize) {
    let mut headings = 0;
    let mut lines = 0;
    let mut paragraphs = 0;
    for block in blocks {
        match block {
            ContentBlock::Heading { .. } => headings += 1,
            ContentBlock::BulletLine { .. } | ContentBlock::LabeledLine { .. } => lines += 1,
            ContentBlock::Paragraph { .. } => paragraphs += 1,
            ContentBlock::SpacingHint { .. } => {}
        }
    }
    println!(
        "Found {} heading(s), {} line(s), {} paragraph(s) and {} gallery image(s)",
        headings, lines, paragraphs, images
    );
    for block in blocks.iter().filter(|b| !b.is_spacing()) {
        println!("  {}", block);
    }
}

fn run(matches: &clap::ArgMatches, verbosity: Verbosity) -> Result<(), AppError> {
    let url = matches
        .get_one::<String>("url")
        .ok_or_else(|| AppError::PathError("No listing URL provided".to_string()))?;

    let config_path = find_config_file(matches);
    let source = match &config_path {
        Some(path) => {
            debug!("Using configuration {}", path);
            ConfigSource::File(path)
        }
        None => ConfigSource::Default,
    };
    let mut config = config::load_config_from_source(source);
    if let Some(dir) = matches.get_one::<String>("upload-dir") {
        config.logo.upload_dir = PathBuf::from(dir);
    }

    if matches.get_flag("dry-run") {
        let (blocks, images) =
            listing2pdf::extract_listing(url, &config).map_err(AppError::ReportError)?;
        if verbosity != Verbosity::Quiet {
            print_summary(&blocks, images.len());
            println!("Dry-run complete. No PDF generated.");
        }
        return Ok(());
    }

    let output_path = get_output_path(matches, url)?;
    let request = build_request(matches, url, &config);
    if verbosity == Verbosity::Verbose {
        info!("Generating report for {}", request.url);
        if request.translate {
            info!(
                "   Language: {} -> {}",
                request.source_language, request.target_language
            );
        }
    }

    listing2pdf::generate_report_to_file(&request, &config, &output_path)
        .map_err(AppError::ReportError)?;

    if verbosity != Verbosity::Quiet {
        println!("Successfully saved PDF to {}", output_path.display());

        if verbosity == Verbosity::Verbose {
            if let Ok(metadata) = fs::metadata(&output_path) {
                let size_kb = metadata.len() as f64 / 1024.0;
                if size_kb < 1024.0 {
                    println!("   Size: {:.1} KB", size_kb);
                } else {
                    println!("   Size: {:.2} MB", size_kb / 1024.0);
                }
            }
        }
    }

    Ok(())
}

fn build_cli() -> Command {
    let cmd = Command::new("listing2pdf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn a real-estate listing page into a branded PDF brochure")
        .after_help(
            "EXAMPLES:\n  \
            listing2pdf -u https://example.com/ilan/sea-view-flat/ -l en\n  \
            listing2pdf -u URL --logo logo.png --company-name \"Acme Realty\" --phone \"+90 555 000 00 00\"\n  \
            listing2pdf -u URL --no-translate -o brochure.pdf\n  \
            listing2pdf -u URL --dry-run --verbose\n",
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Listing page to turn into a PDF"),
        )
        .arg(
            Arg::new("lang")
                .short('l')
                .long("lang")
                .value_name("LANG")
                .help("Target language code (defaults to translation.target)"),
        )
        .arg(
            Arg::new("source-lang")
                .long("source-lang")
                .value_name("LANG")
                .help("Source language code (defaults to auto-detection)"),
        )
        .arg(
            Arg::new("no-translate")
                .long("no-translate")
                .help("Keep the listing text in its original language")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("logo")
                .long("logo")
                .value_name("IMAGE")
                .help("Agent logo image shown in the footer"),
        )
        .arg(
            Arg::new("upload-dir")
                .long("upload-dir")
                .value_name("DIR")
                .help("Folder where the processed logo is stored (defaults to static/uploads)"),
        );

    let cmd = CONTACT_ARGS.iter().fold(cmd, |cmd, (_, id, help)| {
        cmd.arg(Arg::new(*id).long(*id).value_name("VALUE").help(*help))
    });

    cmd.arg(
        Arg::new("output")
            .short('o')
            .long("output")
            .value_name("OUTPUT_PATH")
            .help("Path to the output PDF file (defaults to <listing-slug>.pdf)"),
    )
    .arg(
        Arg::new("config")
            .short('c')
            .long("config")
            .value_name("CONFIG_FILE")
            .help("Path to configuration file (TOML format). Auto-detects listing2pdfrc.toml if not specified"),
    )
    .arg(
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Show detailed output including per-stage timings and file size")
            .action(ArgAction::SetTrue)
            .conflicts_with("quiet"),
    )
    .arg(
        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .help("Suppress all output except errors")
            .action(ArgAction::SetTrue)
            .conflicts_with("verbose"),
    )
    .arg(
        Arg::new("dry-run")
            .long("dry-run")
            .help("Fetch and extract the listing, print what was found, generate no PDF")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("get-default-configuration")
            .long("get-default-configuration")
            .help("Print a default listing2pdfrc.toml to stdout and exit")
            .action(ArgAction::SetTrue),
    )
}

fn main() {
    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    let verbosity = if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    // Initialize logger with environment variable control (RUST_LOG)
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbosity {
        Verbosity::Quiet => {
            logger.filter_level(log::LevelFilter::Error);
        }
        Verbosity::Verbose => {
            logger.filter_level(log::LevelFilter::Debug);
        }
        Verbosity::Normal => {}
    }
    logger.format_timestamp_millis().init();

    // Print a default configuration TOML and exit if requested
    if matches.get_flag("get-default-configuration") {
        println!("{}", config::default_config_toml());
        process::exit(0);
    }

    if !matches.contains_id("url") {
        let _ = cmd.print_help();
        println!();
        process::exit(1);
    }

    if let Err(e) = run(&matches, verbosity) {
        match e {
            AppError::ReportError(e) => error!("[X] {}", e),
            AppError::PathError(e) => error!("[X] Path error: {}", e),
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_get_output_path_default_and_custom() {
        let url = "https://example.com/ilan/sea-view-flat/";
        let matches = build_cli().get_matches_from(vec!["listing2pdf", "-u", url]);
        let default_path = get_output_path(&matches, url).unwrap();
        assert!(default_path.ends_with("sea-view-flat.pdf"));

        let matches = build_cli().get_matches_from(vec!["listing2pdf", "-u", url, "-o", "my.pdf"]);
        let custom_path = get_output_path(&matches, url).unwrap();
        assert!(custom_path.ends_with("my.pdf"));
    }

    #[test]
    fn test_cli_contact_overrides_config() {
        let matches = build_cli().get_matches_from(vec![
            "listing2pdf",
            "-u",
            "https://example.com/a",
            "--phone",
            "555",
            "--address",
            "Street 1\\nCity",
        ]);
        let defaults = ContactInfo {
            phone: Some("111".into()),
            email: Some("agent@example.com".into()),
            ..Default::default()
        };
        let contact = get_contact(&matches, &defaults);
        assert_eq!(contact.get(ContactField::Phone), Some("555"));
        assert_eq!(contact.get(ContactField::Email), Some("agent@example.com"));
        assert_eq!(contact.get(ContactField::Address), Some("Street 1\nCity"));
    }

    #[test]
    fn test_build_request_flags() {
        let config = ReportConfig::default();
        let matches = build_cli().get_matches_from(vec![
            "listing2pdf",
            "-u",
            "https://example.com/a",
            "-l",
            "de",
            "--no-translate",
            "--logo",
            "logo.png",
        ]);
        let request = build_request(&matches, "https://example.com/a", &config);
        assert_eq!(request.target_language, "de");
        assert!(!request.translate);
        assert_eq!(request.logo, Some(PathBuf::from("logo.png")));
    }

    #[test]
    fn test_find_config_file_explicit() {
        let matches =
            build_cli().get_matches_from(vec!["listing2pdf", "--config", "custom.toml"]);
        assert_eq!(find_config_file(&matches), Some("custom.toml".to_string()));
    }
}
