// SPDX-License-Identifier: Apache-2.0

//! The interactive numeric menu

use std::collections::HashMap;
use std::io::Write;

use datafusion::common::DataFusionError;
use datafusion::prelude::DataFrame;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::error::{MenuError, MenuResult, QueryError};
use crate::queries;
use crate::render;
use crate::session::{SakilaSession, SakilaTable};

pub const WELCOME: &str = "Welcome!\nThe menu is as follows:";
pub const SELECTION_PROMPT: &str = "Please enter your selection";
pub const QUERY_PROMPT: &str = "Please enter your query";
pub const NOT_A_NUMBER: &str = "Enter a number!";
pub const QUERY_FAILED: &str = "Unable to process this query!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuSelection {
    DistinctLastNameCount = 1,
    NonRepeatedLastNames = 2,
    RepeatedLastNames = 3,
    AverageFilmLength = 4,
    AverageLengthByCategory = 5,
    CustomQuery = 6,
    Quit = 7,
}

/// A menu line and the tables its operation reads
#[derive(Debug)]
pub struct MenuEntry {
    pub selection: MenuSelection,
    pub label: &'static str,
    pub tables: &'static [SakilaTable],
}

/// Menu entries in display order
pub static MENU: [MenuEntry; 7] = [
    MenuEntry {
        selection: MenuSelection::DistinctLastNameCount,
        label: "How many distinct actors last names are there?",
        tables: &[SakilaTable::Actor],
    },
    MenuEntry {
        selection: MenuSelection::NonRepeatedLastNames,
        label: "Which last names are not repeated?",
        tables: &[SakilaTable::Actor],
    },
    MenuEntry {
        selection: MenuSelection::RepeatedLastNames,
        label: "Which last names appear more than once?",
        tables: &[SakilaTable::Actor],
    },
    MenuEntry {
        selection: MenuSelection::AverageFilmLength,
        label: "What is that average running time of all the films in the sakila DB?",
        tables: &[SakilaTable::Film],
    },
    MenuEntry {
        selection: MenuSelection::AverageLengthByCategory,
        label: "What is the average running time of films by category?",
        tables: &[
            SakilaTable::Film,
            SakilaTable::FilmCategory,
            SakilaTable::Category,
        ],
    },
    MenuEntry {
        selection: MenuSelection::CustomQuery,
        label: "Custom SQL Query",
        tables: &[],
    },
    MenuEntry {
        selection: MenuSelection::Quit,
        label: "Quit",
        tables: &[],
    },
];

impl MenuSelection {
    pub fn entry(self) -> &'static MenuEntry {
        &MENU[self as usize - 1]
    }

    pub fn label(self) -> &'static str {
        self.entry().label
    }

    pub fn tables(self) -> &'static [SakilaTable] {
        self.entry().tables
    }
}

impl TryFrom<i64> for MenuSelection {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        MENU.iter()
            .find(|entry| entry.selection as i64 == value)
            .map(|entry| entry.selection)
            .ok_or(value)
    }
}

/// What a line typed at the selection prompt means
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Selection(MenuSelection),
    /// An integer naming no entry, possibly too large for any integer type
    OutOfRange,
    NotANumber,
}

impl Input {
    /// An integer is an optional sign and decimal digits, with surrounding
    /// whitespace allowed
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let digits = line.strip_prefix(&['+', '-'][..]).unwrap_or(line);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Input::NotANumber;
        }
        line.parse::<i64>()
            .ok()
            .and_then(|number| MenuSelection::try_from(number).ok())
            .map_or(Input::OutOfRange, Input::Selection)
    }
}

/// Write the welcome banner and the numbered entries
pub fn print_menu(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", WELCOME)?;
    for entry in &MENU {
        writeln!(out, "{} - {}", entry.selection as i64, entry.label)?;
    }
    Ok(())
}

/// Frames loaded for one selection, keyed by table
struct LoadedTables(HashMap<SakilaTable, DataFrame>);

impl LoadedTables {
    fn take(&mut self, table: SakilaTable) -> MenuResult<DataFrame> {
        self.0.remove(&table).ok_or_else(|| {
            DataFusionError::Internal(format!("table {} was not loaded", table)).into()
        })
    }
}

pub struct QueryMenu<'a> {
    session: &'a SakilaSession,
    show_rows: usize,
}

impl<'a> QueryMenu<'a> {
    pub fn new(session: &'a SakilaSession, show_rows: usize) -> Self {
        Self { session, show_rows }
    }

    /// Prompt, read and dispatch until the user quits or `input` ends.
    ///
    /// Only console I/O failures end the loop with an error; query
    /// failures are reported on `out` and the menu is shown again.
    pub async fn run<R, W>(&self, input: R, out: &mut W) -> MenuResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            print_menu(out)?;
            writeln!(out, "{}", SELECTION_PROMPT)?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                info!("End of input, leaving the menu");
                return Ok(());
            };
            let selection = match Input::parse(&line) {
                Input::Selection(selection) => selection,
                Input::OutOfRange => {
                    debug!("Ignoring selection {}", line.trim());
                    continue;
                }
                Input::NotANumber => {
                    writeln!(out, "{}", NOT_A_NUMBER)?;
                    continue;
                }
            };
            debug!("Selected {:?}", selection);

            match selection {
                MenuSelection::Quit => return Ok(()),
                MenuSelection::CustomQuery => {
                    writeln!(out, "{}", QUERY_PROMPT)?;
                    out.flush()?;
                    let Some(query) = lines.next_line().await? else {
                        info!("End of input, leaving the menu");
                        return Ok(());
                    };
                    self.custom_query(&query, out).await?;
                }
                _ => match self.canned_query(selection, out).await {
                    Ok(()) => {}
                    Err(MenuError::Io(e)) => return Err(e.into()),
                    Err(e) => {
                        warn!("{} failed: {}", selection.label(), e);
                        writeln!(out, "error: {}", e)?;
                    }
                },
            }
        }
    }

    async fn load(&self, selection: MenuSelection) -> MenuResult<LoadedTables> {
        let mut tables = HashMap::new();
        for table in selection.tables() {
            tables.insert(*table, self.session.table(*table).await?);
        }
        Ok(LoadedTables(tables))
    }

    async fn canned_query(&self, selection: MenuSelection, out: &mut impl Write) -> MenuResult<()> {
        let mut tables = self.load(selection).await?;
        match selection {
            MenuSelection::DistinctLastNameCount => {
                let actor = tables.take(SakilaTable::Actor)?;
                let count = queries::distinct_last_name_count(actor).await?;
                writeln!(out, "There are a total of unique distinct names are: {}", count)?;
            }
            MenuSelection::NonRepeatedLastNames => {
                let df = queries::non_repeated_last_names(tables.take(SakilaTable::Actor)?)?;
                writeln!(out, "The non repeated last names are the following")?;
                render::show(df, self.show_rows, out).await?;
            }
            MenuSelection::RepeatedLastNames => {
                let df = queries::repeated_last_names(tables.take(SakilaTable::Actor)?)?;
                writeln!(out, "The repeated last names are the following")?;
                render::show(df, self.show_rows, out).await?;
            }
            MenuSelection::AverageFilmLength => {
                let df = queries::average_film_length(tables.take(SakilaTable::Film)?)?;
                writeln!(out, "Average film time is: ")?;
                render::show(df, self.show_rows, out).await?;
            }
            MenuSelection::AverageLengthByCategory => {
                let df = queries::average_length_by_category(
                    tables.take(SakilaTable::Film)?,
                    tables.take(SakilaTable::FilmCategory)?,
                    tables.take(SakilaTable::Category)?,
                )?;
                writeln!(out, "Average film time is: ")?;
                render::show(df, self.show_rows, out).await?;
            }
            MenuSelection::CustomQuery | MenuSelection::Quit => {}
        }
        Ok(())
    }

    /// Run a free-form relation and show it; any failure, including one
    /// raised while the rows are read, is classified and reported.
    async fn custom_query(&self, query: &str, out: &mut impl Write) -> MenuResult<()> {
        let df = match self.session.custom_query(query).await {
            Ok(df) => df,
            Err(e) => return report(e, out),
        };
        match render::show(df, self.show_rows, out).await {
            Ok(()) => Ok(()),
            Err(MenuError::Io(e)) => Err(e.into()),
            Err(e) => report(e.into(), out),
        }
    }
}

fn report(err: QueryError, out: &mut impl Write) -> MenuResult<()> {
    warn!(kind = %err.kind, "Unable to process query: {}", err.message);
    writeln!(out, "{}", QUERY_FAILED)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_text() {
        let mut out = vec![];
        print_menu(&mut out).unwrap();
        let expected = "\
Welcome!
The menu is as follows:
1 - How many distinct actors last names are there?
2 - Which last names are not repeated?
3 - Which last names appear more than once?
4 - What is that average running time of all the films in the sakila DB?
5 - What is the average running time of films by category?
6 - Custom SQL Query
7 - Quit
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_selection_from_number() {
        assert_eq!(
            MenuSelection::try_from(1_i64),
            Ok(MenuSelection::DistinctLastNameCount)
        );
        assert_eq!(MenuSelection::try_from(7_i64), Ok(MenuSelection::Quit));
        assert_eq!(MenuSelection::try_from(0_i64), Err(0));
        assert_eq!(MenuSelection::try_from(8_i64), Err(8));
        assert_eq!(MenuSelection::try_from(-1_i64), Err(-1));
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(
            Input::parse(" 3 "),
            Input::Selection(MenuSelection::RepeatedLastNames)
        );
        assert_eq!(Input::parse("+7"), Input::Selection(MenuSelection::Quit));
        assert_eq!(Input::parse("8"), Input::OutOfRange);
        assert_eq!(Input::parse("-1"), Input::OutOfRange);
        assert_eq!(Input::parse("99999999999999999999999"), Input::OutOfRange);
        assert_eq!(Input::parse("-99999999999999999999999"), Input::OutOfRange);
        assert_eq!(Input::parse("abc"), Input::NotANumber);
        assert_eq!(Input::parse(""), Input::NotANumber);
        assert_eq!(Input::parse("-"), Input::NotANumber);
        assert_eq!(Input::parse("1.5"), Input::NotANumber);
        assert_eq!(Input::parse("1 2"), Input::NotANumber);
    }

    #[test]
    fn test_entries_match_selections() {
        for (i, entry) in MENU.iter().enumerate() {
            assert_eq!(entry.selection as usize, i + 1);
            assert_eq!(entry.selection.entry().label, entry.label);
        }
        assert_eq!(
            MenuSelection::AverageLengthByCategory.tables(),
            &[
                SakilaTable::Film,
                SakilaTable::FilmCategory,
                SakilaTable::Category
            ]
        );
        assert!(MenuSelection::Quit.tables().is_empty());
    }
}
