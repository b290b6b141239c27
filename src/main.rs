use anyhow::{Context, bail};
use chrono::Local; // timestamp in log lines
use clap::Parser;
use env_logger::{Env, Target};
use serde::Deserialize;
use std::io::Write; // for env_logger custom formatter
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use lead_form::{
    config::Config,
    external::LeadApiClient,
    models::{Attachment, BUSINESS_STATUS_OPTIONS, Flag, ServiceTag, TextField, VerificationStatus},
    services::{FrameReporter, LeadForm, LogBridge, OtpVerifier},
    store::{FileStore, KeyValueStore},
    tasks,
    utils::{Clock, SystemClock, origin_of, page_context},
};

#[derive(Parser, Debug)]
#[command(name = "lead-form", version, about = "Verify a lead's email and post it to the CRM")]
struct Cli {
    /// TOML file with the lead's fields
    lead_file: PathBuf,

    /// URL of the page the form is embedded in (utm_* parameters are read from it)
    #[arg(long, default_value = "")]
    page_url: String,

    /// Title of the embedding page
    #[arg(long, default_value = "")]
    page_title: String,

    /// File to attach; repeat for several
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,

    /// Height to report to the host page instead of the rendered line count
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LeadFile {
    first_name: String,
    last_name: String,
    company: String,
    email: String,
    phone: String,
    country: String,
    business_status: String,
    message: String,
    service: Vec<ServiceTag>,
    agree_terms: bool,
    agree_marketing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        // stdout carries the prompts
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config =
        Config::from_toml().map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    let client = LeadApiClient::new(config.backend.clone())?;
    let store = FileStore::open(&config.storage.path, origin_of(&cli.page_url))?;
    let otp = OtpVerifier::new(store, SystemClock, &config.otp);

    let page = page_context(&cli.page_url, &cli.page_title);
    let mut form = LeadForm::new(page, otp, config.redirect.clone());
    fill_form(&mut form, &cli).await?;

    let frame = FrameReporter::new(LogBridge);
    let rendered = render(&form);
    frame.on_mount(cli.height.unwrap_or(rendered))?;

    if form.status() == VerificationStatus::CodeSent {
        println!("A code was already sent to {}.", form.fields().email);
    } else {
        // failures are surfaced through the notice
        let _ = form.request_code(&client).await;
        show_notice(&form);
        form.dismiss_notice();
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while !form.otp().is_verified() {
        print!("Enter the code sent to {} (or 'resend'): ", form.fields().email);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            bail!("input closed before the email was verified");
        };
        let input = line.trim();

        if input.eq_ignore_ascii_case("resend") {
            if form.cooldown_remaining() > 0 {
                println!("Resend available in {}s...", form.cooldown_remaining());
            }
            tasks::wait_out_cooldown(&mut form).await;
            let _ = form.request_code(&client).await;
        } else {
            let _ = form.verify_code(input);
        }
        show_notice(&form);
        form.dismiss_notice();
    }

    let rendered = render(&form);
    frame.on_resize(cli.height.unwrap_or(rendered))?;

    let outcome = match form.submit(&client).await {
        Ok(outcome) => outcome,
        Err(e) => {
            show_notice(&form);
            return Err(e.into());
        }
    };
    println!("{}", outcome.message);

    if let Some(redirect) = outcome.redirect {
        log::info!("Redirecting to {} in {:?}", redirect.url, redirect.delay);
        tokio::time::sleep(redirect.delay).await;
        println!("Redirect: {}", redirect.url);
    }

    Ok(())
}

async fn fill_form<S: KeyValueStore, C: Clock>(
    form: &mut LeadForm<S, C>,
    cli: &Cli,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&cli.lead_file)
        .await
        .with_context(|| format!("Failed to read lead file {}", cli.lead_file.display()))?;
    let lead: LeadFile = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse lead file {}", cli.lead_file.display()))?;

    form.set_field(TextField::FirstName, lead.first_name);
    form.set_field(TextField::LastName, lead.last_name);
    form.set_field(TextField::Company, lead.company);
    form.set_field(TextField::Email, lead.email);
    form.set_field(TextField::Phone, lead.phone);
    form.set_field(TextField::Country, lead.country);
    if !lead.business_status.is_empty()
        && !BUSINESS_STATUS_OPTIONS.contains(&lead.business_status.as_str())
    {
        log::warn!("Unlisted business status {:?}", lead.business_status);
    }
    form.set_field(TextField::BusinessStatus, lead.business_status);
    form.set_field(TextField::Message, lead.message);
    for tag in lead.service {
        if !form.fields().service.contains(&tag) {
            form.toggle_service(tag);
        }
    }
    form.set_flag(Flag::AgreeTerms, lead.agree_terms);
    form.set_flag(Flag::AgreeMarketing, lead.agree_marketing);

    let mut attachments = Vec::with_capacity(cli.attachments.len());
    for path in &cli.attachments {
        attachments.push(load_attachment(path).await?);
    }
    form.set_attachments(attachments);

    if let Some(err) = form.email_error() {
        bail!("{err}");
    }
    Ok(())
}

async fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read attachment {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment::new(file_name, bytes))
}

/// Prints the form summary and returns its height in lines.
fn render<S: KeyValueStore, C: Clock>(form: &LeadForm<S, C>) -> u32 {
    let f = form.fields();
    let mut lines = vec![
        format!("Name:            {}", f.display_name()),
        format!("Email:           {} [{}]", f.email, form.status()),
        format!("Company:         {}", f.company),
        format!("Phone:           {}", f.phone),
        format!("Country:         {}", f.country),
        format!("Business status: {}", f.business_status),
    ];
    if !f.service.is_empty() {
        let services: Vec<&str> = f.service.iter().map(|s| s.description()).collect();
        lines.push(format!("Services:        {}", services.join(", ")));
    }
    if !f.attachments.is_empty() {
        lines.push(format!("Attachments:     {} file(s)", f.attachments.len()));
    }
    for line in &lines {
        println!("{line}");
    }
    lines.len() as u32
}

fn show_notice<S: KeyValueStore, C: Clock>(form: &LeadForm<S, C>) {
    if let Some(notice) = form.notice() {
        if notice.is_error() {
            println!("Error: {}", notice.message);
        } else {
            println!("{}", notice.message);
        }
    }
}
