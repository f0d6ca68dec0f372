//! Interactive shell
//!
//! Line-oriented front-end over the workflow: reads commands from any
//! `BufRead`, writes messages to any `Write`. No error ends the shell; only
//! `quit`, `exit` or end of input do.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::api::{ApiClient, FileHandle, PresignedUrlPair};
use crate::config::Config;
use crate::poller::{PollPolicy, Sleeper, TokioSleeper};
use crate::preview::CsvPreview;
use crate::session::Session;
use crate::workflow::{Workflow, WorkflowObserver, WorkflowState};

const HELP: &str = "\
Commands:
  login            enter API endpoint and API key
  logout           forget credentials
  status           show authentication and last upload
  upload <file>    upload a PDF bank statement and wait for the CSV
  download [path]  save the CSV of the last upload and preview it
  help             show this message
  quit             leave";

/// Writes workflow progress as user-facing messages
struct Printer<'a, W: Write> {
    out: &'a mut W,
    policy: PollPolicy,
}

impl<W: Write> Printer<'_, W> {
    fn say(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "{}", message) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> WorkflowObserver for Printer<'_, W> {
    fn on_state(&mut self, state: &WorkflowState) {
        match state {
            WorkflowState::Unauthenticated => {
                self.say("Not authenticated. Please authenticate using `login` to upload files.")
            }
            WorkflowState::Authenticated => {
                self.say("Authentication successful! You can now upload files.")
            }
            WorkflowState::UrlsRequested { file_name } => {
                self.say(&format!("Requesting upload URL for {}...", file_name))
            }
            WorkflowState::Uploading { .. } => self.say("Uploading file..."),
            WorkflowState::Uploaded { .. } => self.say("File uploaded successfully!"),
            WorkflowState::Polling { .. } => {
                let message = format!(
                    "Processing your PDF... This may take a few moments (up to {}s).",
                    self.policy.max_wait().as_secs()
                );
                self.say(&message)
            }
            WorkflowState::Ready { urls } => {
                self.say("Processing complete! Your CSV file is ready.");
                self.say(&format!("Download your processed CSV file: {}", urls.download_url));
            }
            WorkflowState::TimedOut { urls } => {
                self.say(
                    "Processing is taking longer than expected. \
                     Please check back later using the download link.",
                );
                self.say(&format!("Check your CSV file here: {}", urls.download_url));
            }
            WorkflowState::Failed { error } => self.say(&format!("Error: {}", error)),
        }
    }

    fn on_poll_attempt(&mut self, attempt: u32, max_attempts: u32) {
        self.say(&format!("  checking for result ({}/{})", attempt, max_attempts));
    }
}

/// The shell and everything it owns for one session
pub struct App<R, W, S = TokioSleeper> {
    input: R,
    output: W,
    session: Session,
    workflow: Workflow<S>,
    config: Config,
}

impl<R: BufRead, W: Write> App<R, W, TokioSleeper> {
    /// Create a shell talking to the real clock
    pub fn new(input: R, output: W, config: Config) -> Result<Self> {
        let client = ApiClient::new(config.request_timeout)?;
        Ok(Self::with_workflow(input, output, Workflow::new(client), config))
    }
}

impl<R: BufRead, W: Write, S: Sleeper> App<R, W, S> {
    pub fn with_workflow(input: R, output: W, workflow: Workflow<S>, config: Config) -> Self {
        Self {
            input,
            output,
            session: Session::new(),
            workflow,
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Read and execute commands until `quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "PDF Transaction Extractor")?;
        writeln!(
            self.output,
            "Please authenticate using `login` to upload files. Type `help` for commands."
        )?;

        while let Some(line) = self.prompt("> ")? {
            let line = line.trim();
            let (command, argument) = match line.split_once(char::is_whitespace) {
                Some((command, rest)) => (command, rest.trim()),
                None => (line, ""),
            };

            match command {
                "" => {}
                "login" => self.login()?,
                "logout" => self.logout()?,
                "status" => self.status()?,
                "upload" => self.upload(argument).await?,
                "download" => self.download(argument).await?,
                "help" => writeln!(self.output, "{}", HELP)?,
                "quit" | "exit" => break,
                other => writeln!(
                    self.output,
                    "Unknown command: {}. Type `help` for commands.",
                    other
                )?,
            }
        }

        tracing::info!("Shell closed");
        Ok(())
    }

    /// Print `label` and read one line; `None` at end of input
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&raw);
        if let std::borrow::Cow::Owned(_) = line {
            tracing::warn!("Input line was not valid UTF-8, invalid bytes replaced");
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn login(&mut self) -> Result<()> {
        if self.session.is_authenticated() {
            writeln!(
                self.output,
                "Already authenticated against {}. Use `logout` first.",
                self.session.endpoint()
            )?;
            return Ok(());
        }

        let Some(endpoint) = self.prompt("API Endpoint: ")? else {
            return Ok(());
        };
        let Some(api_key) = self.prompt("API Key: ")? else {
            return Ok(());
        };

        let mut printer = Printer {
            out: &mut self.output,
            policy: self.workflow.policy(),
        };
        if let Err(e) = self.workflow.login(
            &mut self.session,
            endpoint.trim(),
            api_key.trim(),
            &mut printer,
        ) {
            printer.say(&format!("Error: {}", e));
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let mut printer = Printer {
            out: &mut self.output,
            policy: self.workflow.policy(),
        };
        self.workflow.logout(&mut self.session, &mut printer);
        Ok(())
    }

    fn status(&mut self) -> Result<()> {
        if !self.session.is_authenticated() {
            writeln!(self.output, "Not authenticated")?;
            return Ok(());
        }

        writeln!(self.output, "Authenticated")?;
        writeln!(self.output, "API Endpoint: {}", self.session.endpoint())?;
        writeln!(self.output, "API Key: {}", self.session.masked_key())?;
        writeln!(self.output, "Last upload: {}", self.workflow.state().name())?;
        writeln!(
            self.output,
            "Upload complete: {}, processing complete: {}",
            yes_no(self.session.upload_complete()),
            yes_no(self.session.processing_complete())
        )?;
        if let Some(url) = self.workflow.state().download_url() {
            writeln!(self.output, "Download link: {}", url)?;
        }
        Ok(())
    }

    async fn upload(&mut self, argument: &str) -> Result<()> {
        if !self.session.is_authenticated() {
            writeln!(self.output, "Please authenticate using `login` to upload files.")?;
            return Ok(());
        }
        if argument.is_empty() {
            writeln!(self.output, "Usage: upload <file.pdf>")?;
            return Ok(());
        }

        let file = match FileHandle::from_path(Path::new(argument)).await {
            Ok(file) => file,
            Err(e) => {
                writeln!(self.output, "Error: {}", e)?;
                return Ok(());
            }
        };

        let mut printer = Printer {
            out: &mut self.output,
            policy: self.workflow.policy(),
        };
        if let Err(e) = self.workflow.run(&mut self.session, file, &mut printer).await {
            printer.say(&format!("Error: {}", e));
        }
        Ok(())
    }

    async fn download(&mut self, argument: &str) -> Result<()> {
        if !self.session.is_authenticated() {
            writeln!(self.output, "Please authenticate using `login` to download files.")?;
            return Ok(());
        }

        let urls: PresignedUrlPair = match self.workflow.state() {
            WorkflowState::Ready { urls } | WorkflowState::TimedOut { urls } => urls.clone(),
            _ => {
                writeln!(self.output, "Nothing to download yet. Upload a file first.")?;
                return Ok(());
            }
        };

        let target = if argument.is_empty() {
            self.config.output_dir.join(urls.result_file_name())
        } else {
            PathBuf::from(argument)
        };

        writeln!(self.output, "Downloading {}...", urls.download_url)?;
        let data = match self.workflow.client().download(&urls.download_url).await {
            Ok(data) => data,
            Err(e) => {
                writeln!(self.output, "Error: {}", e)?;
                return Ok(());
            }
        };

        if let Err(e) = tokio::fs::write(&target, &data).await {
            writeln!(self.output, "Error: Failed to save {}: {}", target.display(), e)?;
            return Ok(());
        }
        tracing::info!("Saved {} bytes to {:?}", data.len(), target);
        writeln!(self.output, "Saved {} bytes to {}", data.len(), target.display())?;

        if self.config.preview_rows > 0 {
            match CsvPreview::parse(&data, self.config.preview_rows) {
                Ok(preview) => writeln!(self.output, "{}", preview.render())?,
                Err(e) => writeln!(self.output, "Could not preview the CSV: {:#}", e)?,
            }
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
