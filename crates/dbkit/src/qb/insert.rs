//! INSERT / REPLACE builders and the upsert (ODKU) clause.

use std::sync::Arc;

use crate::dialect::{DialectSettings, IgnoreStyle, UpsertStyle};
use crate::error::{QueryError, QueryResult};
use crate::qb::traits::{HasValueList, Renderable};
use crate::qb::values::ValueList;

/// Update part of an upsert.
#[derive(Debug, Clone, PartialEq)]
struct Upsert {
    keys: Vec<String>,
    values: ValueList,
}

/// INSERT query builder.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    settings: Arc<DialectSettings>,
    table: String,
    values: ValueList,
    ignore: bool,
    upsert: Option<Upsert>,
    error: Option<QueryError>,
}

impl InsertQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, table: &str) -> Self {
        Self {
            error: settings.validate_table_name(table).err(),
            values: ValueList::new(Arc::clone(&settings)),
            settings,
            table: table.to_string(),
            ignore: false,
            upsert: None,
        }
    }

    /// Skip rows whose key already exists.
    pub fn ignore_exists(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Start (or continue) the on-duplicate-key update clause.
    pub fn odku(mut self) -> OdkuQuery {
        let upsert = self.upsert.take().unwrap_or_else(|| Upsert {
            keys: Vec::new(),
            values: ValueList::new(Arc::clone(&self.settings)),
        });
        OdkuQuery {
            insert: self,
            keys: upsert.keys,
            values: upsert.values,
        }
    }

    pub fn values(&self) -> &ValueList {
        &self.values
    }

    fn render(&self, upsert: Option<&Upsert>) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.values.check("INSERT")?;

        let ignore_style = self.settings.ignore_style();
        let verb = match (self.ignore, ignore_style) {
            (true, IgnoreStyle::Verb(verb)) => verb,
            _ => "INSERT INTO",
        };

        let mut sql = format!(
            "{} {} ({}) VALUES ({})",
            verb,
            self.settings.escape_table(&self.table),
            self.values.render_columns(),
            self.values.render_values()
        );

        if self.ignore && ignore_style == IgnoreStyle::OnConflictDoNothing {
            if upsert.is_some() {
                return Err(self.unsupported("ignore_exists combined with an upsert"));
            }
            sql.push_str(" ON CONFLICT DO NOTHING");
        }

        if let Some(upsert) = upsert {
            upsert.values.check("ON DUPLICATE KEY UPDATE")?;
            match self.settings.upsert_style() {
                UpsertStyle::OnDuplicateKeyUpdate => {
                    sql.push_str(" ON DUPLICATE KEY UPDATE ");
                }
                UpsertStyle::OnConflictDoUpdate => {
                    if upsert.keys.is_empty() {
                        return Err(self.unsupported("upsert without key columns"));
                    }
                    let keys: Vec<_> = upsert
                        .keys
                        .iter()
                        .map(|k| self.settings.escape_column(k))
                        .collect();
                    sql.push_str(&format!(" ON CONFLICT ({}) DO UPDATE SET ", keys.join(",")));
                }
            }
            sql.push_str(&upsert.values.render_assignments());
        }

        Ok(sql)
    }

    fn unsupported(&self, feature: &'static str) -> QueryError {
        QueryError::Unsupported {
            dialect: self.settings.name(),
            feature,
        }
    }
}

impl HasValueList for InsertQuery {
    fn value_list_mut(&mut self) -> &mut ValueList {
        &mut self.values
    }
}

impl Renderable for InsertQuery {
    fn to_sql(&self) -> QueryResult<String> {
        self.render(self.upsert.as_ref())
    }
}

/// Update clause of an insert, applied when the row's key already exists.
///
/// Obtained from [`InsertQuery::odku`]; [`done`](Self::done) or
/// [`add_from_insert`](Self::add_from_insert) hand the insert back.
#[derive(Debug, Clone, PartialEq)]
pub struct OdkuQuery {
    insert: InsertQuery,
    keys: Vec<String>,
    values: ValueList,
}

impl OdkuQuery {
    /// Record the key (conflict target) columns without adding assignments.
    pub fn key_columns<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if let Err(e) = self.insert.settings.validate_column_name(key) {
                self.insert.error.get_or_insert(e);
            }
            if !self
                .keys
                .iter()
                .any(|k| self.insert.settings.column_names_equal(k, key))
            {
                self.keys.push(key.to_string());
            }
        }
        self
    }

    /// Update every insert column except `keys`, each with the value it is inserted with.
    pub fn add_from_insert<I, S>(self, keys: I) -> InsertQuery
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut odku = self.key_columns(keys);
        let settings = Arc::clone(&odku.insert.settings);
        let updates: Vec<(String, String)> = odku
            .insert
            .values
            .iter()
            .filter(|(column, _)| !odku.keys.iter().any(|k| settings.column_names_equal(k, column)))
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .collect();
        for (column, value) in updates {
            odku.values.push(&column, &value);
        }
        odku.done()
    }

    /// Finish the clause and return the insert.
    pub fn done(mut self) -> InsertQuery {
        self.insert.upsert = Some(Upsert {
            keys: self.keys,
            values: self.values,
        });
        self.insert
    }
}

impl HasValueList for OdkuQuery {
    fn value_list_mut(&mut self) -> &mut ValueList {
        &mut self.values
    }
}

impl Renderable for OdkuQuery {
    fn to_sql(&self) -> QueryResult<String> {
        let upsert = Upsert {
            keys: self.keys.clone(),
            values: self.values.clone(),
        };
        self.insert.render(Some(&upsert))
    }
}

/// REPLACE query builder: delete-then-insert keyed on the primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceQuery {
    settings: Arc<DialectSettings>,
    table: String,
    values: ValueList,
    error: Option<QueryError>,
}

impl ReplaceQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, table: &str) -> Self {
        Self {
            error: settings.validate_table_name(table).err(),
            values: ValueList::new(Arc::clone(&settings)),
            settings,
            table: table.to_string(),
        }
    }
}

impl HasValueList for ReplaceQuery {
    fn value_list_mut(&mut self) -> &mut ValueList {
        &mut self.values
    }
}

impl Renderable for ReplaceQuery {
    fn to_sql(&self) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let verb = self.settings.replace_verb().ok_or(QueryError::Unsupported {
            dialect: self.settings.name(),
            feature: "REPLACE",
        })?;
        self.values.check("REPLACE")?;
        Ok(format!(
            "{} {} ({}) VALUES ({})",
            verb,
            self.settings.escape_table(&self.table),
            self.values.render_columns(),
            self.values.render_values()
        ))
    }
}
