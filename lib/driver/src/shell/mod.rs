use self::prompt::SqlPrompt;
use crate::DriverRef;
use anyhow::Result;
use execution::Session;
use nu_ansi_term::{Color, Style};
use owo_colors::OwoColorize;
use prettytable::{row, Table};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use tracing::debug;

mod prompt;

const HISTORY_FILE: &str = ".r2db2_history";
const HISTORY_SIZE: usize = 100;

/// What the shell should do after a dot command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

pub struct Shell {
    driver: DriverRef,
    session: Session,
    prompt: SqlPrompt,
    line_editor: Reedline,
    bail_on_error: bool,
}

impl Shell {
    pub fn new(driver: DriverRef, session: Session) -> Result<Self> {
        let prompt = SqlPrompt::new(session.user().name(), driver.database().name());
        let history = FileBackedHistory::with_file(HISTORY_SIZE, HISTORY_FILE.into())?;
        let hinter =
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray));
        let line_editor = Reedline::create()
            .with_history(Box::new(history))
            .with_hinter(Box::new(hinter));

        Ok(Self {
            driver,
            session,
            prompt,
            line_editor,
            bail_on_error: false,
        })
    }

    /// Reads and executes lines until `.exit`, Ctrl+D, or an error in bail mode.
    /// Returns the exit code.
    pub fn run(&mut self) -> Result<i32> {
        loop {
            match self.line_editor.read_line(&self.prompt)? {
                Signal::Success(buffer) => {
                    self.prompt.increment_line_count();
                    let line = buffer.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match self.process_line(line) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit(code)) => return Ok(code),
                        Err(error) => {
                            eprintln!("{} {error:#}", "Error:".red().bold());
                            if self.bail_on_error {
                                return Err(error);
                            }
                        }
                    }
                }
                // Abandons the line being edited.
                Signal::CtrlC => {}
                Signal::CtrlD => {
                    println!("Goodbye!");
                    return Ok(0);
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Result<Flow> {
        if line.starts_with('.') {
            return self.handle_dot_command(line);
        }
        let rows = self.driver.execute(&self.session, line)?;
        debug!(rows, "statement executed");
        println!("{}", format!("({rows} rows affected)").black());
        Ok(Flow::Continue)
    }

    pub fn handle_dot_command(&mut self, command: &str) -> Result<Flow> {
        match command.split_whitespace().collect::<Vec<&str>>().as_slice() {
            [".bail"] => {
                let mode = if self.bail_on_error {
                    "on".green().to_string()
                } else {
                    "off".red().to_string()
                };
                println!("{}", format!("Error stop mode is {mode}").purple());
            }
            [".bail", "on"] => self.bail_on_error = true,
            [".bail", "off"] => self.bail_on_error = false,
            [".exit"] | [".quit"] => {
                println!("Goodbye!");
                return Ok(Flow::Exit(0));
            }
            [".exit", code] => {
                println!("Goodbye!");
                return Ok(Flow::Exit(code.parse::<i32>().unwrap_or(0)));
            }
            [".help"] => self.show_help(),
            [".tables"] => self.show_tables(),
            [".indexes"] => self.show_indexes(None)?,
            [".indexes", table] => self.show_indexes(Some(*table))?,
            _ => {
                println!(
                    "{}{}{}{}{}",
                    "Unrecognized dot command".purple(),
                    ":".black(),
                    " `".red(),
                    command.yellow(),
                    "`".red(),
                );
            }
        }
        Ok(Flow::Continue)
    }

    fn show_tables(&self) {
        let mut table = Table::new();
        table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["Schema", "Table", "Columns", "Temporary"]);

        for schema in self.driver.database().schemas() {
            for entry in schema.tables() {
                let columns = entry
                    .columns()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(row![schema.name(), entry.name(), columns, entry.temporary()]);
            }
        }
        table.printstd();
    }

    fn show_indexes(&self, table_name: Option<&str>) -> Result<()> {
        let mut table = Table::new();
        table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["Schema", "Index", "Table", "Type", "Columns", "Persistent"]);

        let indexes = match table_name {
            Some(name) => self.driver.table_indexes(&self.session, name)?,
            None => self
                .driver
                .database()
                .schemas()
                .iter()
                .flat_map(|schema| schema.indexes())
                .collect(),
        };
        for index in indexes {
            let columns = index
                .columns()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(row![
                index.schema_name(),
                index.name(),
                index.table_name(),
                index.index_type(),
                columns,
                index.index_type().is_persistent()
            ]);
        }
        table.printstd();
        Ok(())
    }

    fn show_help(&self) {
        let mut table = Table::new();
        table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["General Help", ""]);
        table.add_row(row![
            "Press Ctrl+D or type .exit to exit",
            "Exit this program"
        ]);
        table.add_row(row![
            "Press Ctrl+R to search through command history",
            "Search through command history"
        ]);
        table.add_row(row![
            "End statements with ; to run several at once",
            "Statements run in order, stopping at the first error"
        ]);
        table.printstd();

        println!();
        println!("Available dot commands:");

        let mut table = Table::new();
        table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["Command", "Description"]);
        table.add_row(row![".bail [on|off]", "Show or set error stop mode"]);
        table.add_row(row![
            ".exit [CODE]",
            "Exit this program with return-code [CODE]"
        ]);
        table.add_row(row![".help", "Show this help information"]);
        table.add_row(row![".indexes [TABLE]", "List indexes, optionally of TABLE only"]);
        table.add_row(row![".quit", "Exit this program (with return-code 0)"]);
        table.add_row(row![".tables", "List tables and their columns"]);
        table.printstd();
    }
}
