//! Interactive console loop.
//!
//! Reads menu choices and field values line by line, calls the task
//! service and prints results. Input and output are injected so the loop
//! runs against standard streams in `main` and against buffers in tests.

use std::io::{self, BufRead, Write};

use crate::db::Backend;
use crate::fields::Priority;
use crate::service::{Completion, IgnoredField, TaskError, TaskService, TaskUpdate};

const PRIORITY_CHOICES: &str = "1-LOW, 2-MEDIUM, 3-HIGH";
const TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Create,
    List,
    Update,
    Delete,
    Complete,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<MenuChoice> {
        match input.trim() {
            "1" => Some(MenuChoice::Create),
            "2" => Some(MenuChoice::List),
            "3" => Some(MenuChoice::Update),
            "4" => Some(MenuChoice::Delete),
            "5" => Some(MenuChoice::Complete),
            "6" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// The menu-driven front end over a task service.
pub struct Console<'a, B: Backend, R, W> {
    service: &'a mut TaskService<B>,
    input: R,
    output: W,
}

impl<'a, B, R, W> Console<'a, B, R, W>
where
    B: Backend,
    R: BufRead,
    W: Write,
{
    pub fn new(service: &'a mut TaskService<B>, input: R, output: W) -> Self {
        Console { service, input, output }
    }

    /// Run until the user picks exit or the input ends.
    ///
    /// Task errors are printed and the loop continues. Only failures of the
    /// console streams themselves are returned.
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "=== Welcome to Task Manager ===")?;
        loop {
            self.show_menu()?;
            let Some(line) = self.read_line()? else {
                writeln!(self.output)?;
                break;
            };

            let result = match MenuChoice::parse(&line) {
                Some(MenuChoice::Create) => self.handle_create(),
                Some(MenuChoice::List) => self.handle_list().map(Ok),
                Some(MenuChoice::Update) => self.handle_update(),
                Some(MenuChoice::Delete) => self.handle_delete(),
                Some(MenuChoice::Complete) => self.handle_complete(),
                Some(MenuChoice::Exit) => break,
                None => writeln!(self.output, "Invalid option. Try again.").map(Ok),
            };
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => writeln!(self.output, "Error: {e}")?,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            writeln!(self.output)?;
        }
        writeln!(self.output, "Goodbye!")?;
        self.output.flush()
    }

    fn show_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "-------------------------")?;
        writeln!(self.output, "1. New task")?;
        writeln!(self.output, "2. List tasks")?;
        writeln!(self.output, "3. Update task")?;
        writeln!(self.output, "4. Remove task")?;
        writeln!(self.output, "5. Complete task")?;
        writeln!(self.output, "6. Exit")?;
        self.prompt("Choose an option: ")
    }

    fn handle_create(&mut self) -> io::Result<Result<(), TaskError>> {
        writeln!(self.output, "\n--- New Task ---")?;
        let title = self.read_required("Title: ")?;
        let description = if self.service.policy().requires_description() {
            self.read_required("Description: ")?
        } else {
            self.prompt("Description: ")?;
            self.read_line_or_eof()?.trim().to_string()
        };
        let priority = self.read_priority()?;

        Ok(match self.service.create_task(&title, &description, priority) {
            Ok(task) => writeln!(self.output, "Task created: {}", task.short_id()).map(Ok)?,
            Err(e) => Err(e),
        })
    }

    fn handle_list(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Tasks ---")?;
        let tasks = self.service.list_all_tasks();
        if tasks.is_empty() {
            return writeln!(self.output, "No tasks found.");
        }
        for task in &tasks {
            writeln!(self.output, "{task}")?;
        }
        Ok(())
    }

    fn handle_update(&mut self) -> io::Result<Result<(), TaskError>> {
        self.handle_list()?;
        let id = self.ask("\nTask id to update (a prefix is enough): ")?;

        // Empty keeps the field; whitespace goes through so the service can warn.
        let title = self.ask("New title (Enter to keep current): ")?;
        let description = self.ask("New description (Enter to keep current): ")?;
        writeln!(self.output, "New priority (Enter to keep current):")?;
        let priority_input = self.ask(&format!("{PRIORITY_CHOICES}: "))?;

        let priority = if priority_input.trim().is_empty() {
            None
        } else {
            let parsed = Priority::parse_input(&priority_input);
            if parsed.is_none() {
                writeln!(self.output, "Invalid priority. Keeping the original.")?;
            }
            parsed
        };

        let update = TaskUpdate {
            title: Some(title).filter(|s| !s.is_empty()),
            description: Some(description).filter(|s| !s.is_empty()),
            priority,
        };
        let outcome = match self.service.update_task(&id, update) {
            Ok(outcome) => outcome,
            Err(e) => return Ok(Err(e)),
        };
        for field in outcome.ignored {
            match field {
                IgnoredField::Title => writeln!(self.output, "Warning: blank title ignored.")?,
                IgnoredField::Description => writeln!(self.output, "Warning: blank description ignored.")?,
            }
        }
        writeln!(self.output, "Task updated: {}", outcome.task)?;
        Ok(Ok(()))
    }

    fn handle_delete(&mut self) -> io::Result<Result<(), TaskError>> {
        self.handle_list()?;
        let id = self.ask("\nTask id to remove: ")?;
        Ok(match self.service.remove_task(&id) {
            Ok(_) => writeln!(self.output, "Task removed.").map(Ok)?,
            Err(e) => Err(e),
        })
    }

    fn handle_complete(&mut self) -> io::Result<Result<(), TaskError>> {
        self.handle_list()?;
        let id = self.ask("\nTask id to complete: ")?;
        Ok(match self.service.complete_task(&id) {
            Ok(Completion::Completed(at)) => {
                writeln!(self.output, "Task marked as completed at {}.", at.format(TIME_FORMAT)).map(Ok)?
            }
            Ok(Completion::AlreadyCompleted(at)) => {
                writeln!(self.output, "Task was already completed at {}.", at.format(TIME_FORMAT)).map(Ok)?
            }
            Err(e) => Err(e),
        })
    }

    /// Prompt until a non-blank value is entered.
    fn read_required(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let value = self.ask(prompt)?;
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
            writeln!(self.output, "This field is required and cannot be empty. Try again.")?;
        }
    }

    /// Prompt until a valid priority code or name is entered.
    fn read_priority(&mut self) -> io::Result<Priority> {
        loop {
            let value = self.ask(&format!("Priority ({PRIORITY_CHOICES}): "))?;
            if let Some(priority) = Priority::parse_input(&value) {
                return Ok(priority);
            }
            writeln!(self.output, "Invalid option. Enter 1, 2 or 3.")?;
        }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.prompt(prompt)?;
        self.read_line_or_eof()
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        write!(self.output, "{prompt}")?;
        self.output.flush()
    }

    /// Next line without its terminator, or `None` at end of input.
    /// Bytes that are not valid UTF-8 become replacement characters.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        if self.input.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    // Input ending in the middle of an operation aborts the session.
    fn read_line_or_eof(&mut self) -> io::Result<String> {
        self.read_line()?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"))
    }
}
