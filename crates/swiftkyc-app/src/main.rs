#![warn(missing_docs)]
//! # swiftkyc-app binary
//!
//! Line-oriented terminal shell over the onboarding wizard and moderation
//! console. Type `help` for the command list.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::{Duration, Instant};

use swiftkyc_app::{AppConfig, AppError, KycApp, app_version, init_tracing};
use swiftkyc_core::DocumentType;
use swiftkyc_remote::api::ModerationDecision;
use swiftkyc_ui::{
    DismissTrigger, NoticeKind, UploadStage, View, render_detail, render_status, render_table,
};
use tracing::{error, info};

const HELP: &str = "\
commands:
  start                         open the customer form
  create <mobile> <age> <name>  create a session
  select <AADHAAR|PAN|PASSPORT|VOTER_ID>
  number <document number>
  file <path>                   use an image file for the document
  camera | capture | uncamera   document camera controls
  submit                        validate the document
  proceed | retry               after a verified document
  selfie-camera | selfie-capture | selfie-submit
  status | resume | restart | back
  admin                         open the moderation console
  filter <status|-> <doc|-> <YYYY-MM-DD|->
  open <session id>             show one record
  close | escape | backdrop     dismiss the record
  approve | reject
  hide                          simulate the window being hidden
  version | help | quit";

/// CLI entry point.
fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("swiftkyc: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = init_tracing(config.log_file.as_deref()) {
        eprintln!("swiftkyc: {error}");
        return ExitCode::FAILURE;
    }

    let mut app = match KycApp::from_config(&config) {
        Ok(app) => app,
        Err(error) => {
            error!(stage = "startup", action = "init_failed", "{error}");
            eprintln!("swiftkyc: {error}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        stage = "startup",
        action = "ready",
        version = app_version(),
        api_base = config.api_base.as_str()
    );

    let clock = Instant::now();
    app.boot();
    println!("swiftkyc {} ({})", app_version(), config.api_base);
    if let Some(session_id) = app.session_id() {
        println!("stored session {session_id}; type `resume` to view its status");
    }
    render(&app);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let now_ms = elapsed_ms(clock);
        match dispatch(&mut app, line.trim(), now_ms) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(error) => info!(stage = "shell", action = "command_failed", "{error}"),
        }
        pump(&mut app, clock);
        render(&app);
    }

    app.on_tab_closed();
    ExitCode::SUCCESS
}

enum Flow {
    Continue,
    Quit,
}

fn dispatch(app: &mut KycApp, line: &str, now_ms: u64) -> Result<Flow, AppError> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "help" => println!("{HELP}"),
        "version" => println!("swiftkyc {}", app_version()),
        "quit" | "exit" => return Ok(Flow::Quit),
        "start" => app.begin_verification(now_ms)?,
        "create" => {
            let mut parts = rest.splitn(3, ' ');
            let mobile = parts.next().unwrap_or_default();
            let age = parts.next().unwrap_or_default();
            let name = parts.next().unwrap_or_default();
            app.create_session(name, mobile, age, now_ms)?;
        }
        "select" => match DocumentType::from_str(rest) {
            Ok(doc_type) => app.select_document(doc_type, now_ms)?,
            Err(error) => println!("! {error}"),
        },
        "number" => app.enter_document_number(rest, now_ms)?,
        "file" => match std::fs::read(rest) {
            Ok(bytes) => {
                let file_name = std::path::Path::new(rest)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string());
                app.choose_document_file(&file_name, bytes)?;
            }
            Err(error) => println!("! cannot read {rest}: {error}"),
        },
        "camera" => app.open_document_camera()?,
        "capture" => app.capture_document()?,
        "uncamera" => app.cancel_camera(),
        "submit" => app.submit_document(now_ms)?,
        "proceed" => app.proceed_to_selfie(now_ms)?,
        "retry" => app.retry_upload(now_ms)?,
        "selfie-camera" => app.open_selfie_camera()?,
        "selfie-capture" => app.capture_selfie()?,
        "selfie-submit" => app.submit_selfie()?,
        "status" => app.load_status()?,
        "resume" => app.resume(now_ms)?,
        "restart" => app.restart(now_ms)?,
        "back" => app.back(now_ms)?,
        "admin" => app.open_admin(now_ms)?,
        "filter" => {
            let mut parts = rest.split_whitespace().map(|part| if part == "-" { "" } else { part });
            let status = parts.next().unwrap_or_default();
            let doc_type = parts.next().unwrap_or_default();
            let date = parts.next().unwrap_or_default();
            app.apply_filters(status, doc_type, date)?;
        }
        "open" => app.open_detail(rest)?,
        "close" => {
            app.dismiss_detail(DismissTrigger::CloseButton);
        }
        "escape" => {
            app.dismiss_detail(DismissTrigger::EscapeKey);
        }
        "backdrop" => {
            app.dismiss_detail(DismissTrigger::Backdrop);
        }
        "approve" => {
            app.moderate(ModerationDecision::Approve, now_ms)?;
        }
        "reject" => {
            app.moderate(ModerationDecision::Reject, now_ms)?;
        }
        "hide" => app.on_tab_hidden(),
        other => println!("! unknown command `{other}`; type `help`"),
    }
    Ok(Flow::Continue)
}

/// Ticks until no submission is outstanding and no timer is pending.
fn pump(app: &mut KycApp, clock: Instant) {
    let mut last_progress = None;
    while app.is_submitting() || !app.timers().is_empty() {
        app.tick(elapsed_ms(clock));
        let ui = app.ui();
        if ui.view == View::UploadDocument && ui.upload.stage == UploadStage::Submitting {
            let percent = ui.upload.progress.percent();
            if last_progress != Some(percent) {
                print!("\ruploading {percent:>3}%");
                let _ = io::stdout().flush();
                last_progress = Some(percent);
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    if last_progress.is_some() {
        println!("\ruploading 100%");
    }
}

fn render(app: &KycApp) {
    let ui = app.ui();
    println!("[{}]", ui.view.name());
    if let Some(notice) = &ui.notice {
        let marker = match notice.kind {
            NoticeKind::Info => "i",
            NoticeKind::Success => "+",
            NoticeKind::Error => "!",
        };
        println!("{marker} {}", notice.text);
    }

    match ui.view {
        View::UploadDocument => {
            if let Some(artifact) = &ui.upload.artifact {
                println!(
                    "artifact {} ({} bytes, {})",
                    artifact.file_name,
                    artifact.len(),
                    &artifact.fingerprint()[..12]
                );
            }
            if ui.upload.camera_live {
                println!("camera live; `capture` to take the photo");
            }
            if ui.upload.stage == UploadStage::Accepted {
                println!("actions: proceed | retry");
            }
        }
        View::SelfieUpload => {
            if ui.selfie.camera_live {
                println!("camera live; `selfie-capture` to take the photo");
            }
            if ui.selfie.artifact.is_some() {
                println!("selfie captured; `selfie-submit` to send it");
            }
        }
        View::Status => {
            if let Some(status) = &ui.status {
                for line in render_status(status) {
                    println!("  {line}");
                }
            }
        }
        View::Admin => {
            for line in render_table(&ui.console.table) {
                println!("  {line}");
            }
            for line in render_detail(&ui.console.modal) {
                println!("  > {line}");
            }
        }
        View::Home | View::CreateSession | View::SelectDocument | View::EnterDocNumber => {}
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}
