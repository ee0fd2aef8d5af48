//! services/client/src/cli/command.rs
//!
//! Defines the line protocol the terminal front end accepts. A line starting
//! with `/` is a command; anything else is a chat message.

use docchat_core::domain::QueryType;
use std::path::PathBuf;

//=========================================================================================
// Commands typed by the user
//=========================================================================================
// NOTE: Threads are addressed by their 1-based position in the `/threads` list,
// sources by their `file_id`.
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent as a freeform question.
    Send(String),

    // --- Threads ---
    NewThread,
    ListThreads,
    SelectThread(usize),
    RenameThread { index: usize, title: String },
    DeleteThread(usize),
    SetIcon { index: usize, icon: String },

    // --- Documents ---
    /// Picks a file from disk and uploads it.
    Upload(PathBuf),
    /// Same as `Upload`, but goes through the drag-and-drop states.
    Drop(PathBuf),
    ListSources,
    ToggleSource(String),
    SetAllSources(bool),
    SetRetrieval(bool),
    DeleteSource(String),
    Preview(String),
    ClosePreview,

    // --- Recommended actions ---
    Action(QueryType),
    DismissBanner,

    // --- Misc ---
    Export(Option<PathBuf>),
    /// Prints the raw text of the n-th transcript entry.
    Copy(usize),
    DismissNotice,
    Health,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command '/{0}'. Type /help for the list of commands.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
Commands:
  <text>                 ask a question
  /new                   start a new thread
  /threads               list threads
  /select N              switch to thread N
  /rename N TITLE        rename thread N
  /icon N EMOJI          change the icon of thread N
  /delete N              delete thread N
  /upload PATH           upload a PDF or image
  /drop PATH             drag-and-drop a file onto the page
  /sources               list uploaded documents
  /toggle FILE_ID        enable or disable a document
  /all on|off            enable or disable every document
  /rag on|off            use the documents when answering
  /delete-source FILE_ID remove a document
  /preview FILE_ID       show a document preview
  /close                 close the preview
  /summarize, /quiz      run a recommended action
  /action NAME           run a recommended action by name
  /dismiss               hide the recommended actions
  /ok                    dismiss the latest notice
  /export [PATH]         save the transcript as a text file
  /copy N                print message N
  /health                check the backend
  /help                  show this help
  /quit                  exit";

fn parse_index(arg: Option<&str>, usage: &'static str) -> Result<usize, ParseError> {
    arg.and_then(|a| a.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or(ParseError::Usage(usage))
}

fn parse_switch(arg: Option<&str>, usage: &'static str) -> Result<bool, ParseError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        Some("on") | Some("true") | Some("yes") => Ok(true),
        Some("off") | Some("false") | Some("no") => Ok(false),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn required(arg: Option<&str>, usage: &'static str) -> Result<String, ParseError> {
    arg.map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or(ParseError::Usage(usage))
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Send(line.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, Some(args.trim())),
            None => (rest, None),
        };
        // Two-part commands split their own argument string.
        let mut split = args.map(|a| a.splitn(2, char::is_whitespace));
        let mut first = || split.as_mut().and_then(|s| s.next());

        let command = match name.to_ascii_lowercase().as_str() {
            "new" => Command::NewThread,
            "threads" => Command::ListThreads,
            "select" => Command::SelectThread(parse_index(args, "/select N")?),
            "rename" => {
                let index = parse_index(first(), "/rename N TITLE")?;
                let title = required(first(), "/rename N TITLE")?;
                Command::RenameThread { index, title }
            }
            "icon" => {
                let index = parse_index(first(), "/icon N EMOJI")?;
                let icon = required(first(), "/icon N EMOJI")?;
                Command::SetIcon { index, icon }
            }
            "delete" => Command::DeleteThread(parse_index(args, "/delete N")?),
            "upload" => Command::Upload(required(args, "/upload PATH")?.into()),
            "drop" => Command::Drop(required(args, "/drop PATH")?.into()),
            "sources" => Command::ListSources,
            "toggle" => Command::ToggleSource(required(args, "/toggle FILE_ID")?),
            "all" => Command::SetAllSources(parse_switch(args, "/all on|off")?),
            "rag" => Command::SetRetrieval(parse_switch(args, "/rag on|off")?),
            "delete-source" => Command::DeleteSource(required(args, "/delete-source FILE_ID")?),
            "preview" => Command::Preview(required(args, "/preview FILE_ID")?),
            "close" => Command::ClosePreview,
            "summarize" => Command::Action(QueryType::Summarize),
            "quiz" => Command::Action(QueryType::Quiz),
            "action" => {
                let name = required(args, "/action summarize|quiz")?;
                match name.parse::<QueryType>() {
                    Ok(QueryType::Freeform) | Err(_) => {
                        return Err(ParseError::Usage("/action summarize|quiz"))
                    }
                    Ok(query_type) => Command::Action(query_type),
                }
            }
            "dismiss" => Command::DismissBanner,
            "ok" => Command::DismissNotice,
            "export" => Command::Export(args.filter(|a| !a.is_empty()).map(PathBuf::from)),
            "copy" => Command::Copy(parse_index(args, "/copy N")?),
            "health" => Command::Health,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}
