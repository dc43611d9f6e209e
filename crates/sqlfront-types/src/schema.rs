//! In-memory mirror of a database schema.
//!
//! A [`Catalog`] owns every [`Table`] and [`Column`] in two arenas. Other
//! structures refer to them through [`TableId`] / [`ColumnId`] handles, so the
//! AST can record what a name resolved to without owning schema objects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sql_type::SqlType;

// ---------------------------------------------------------------------------
// Raw descriptors
// ---------------------------------------------------------------------------

/// One table as reported by the live database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub create_sql: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type exactly as written, e.g. `varchar(40)`.
    #[serde(alias = "type", default)]
    pub complete_type: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
}

/// `from` in the owning table references `table`.`to`. A missing `to` means
/// the referenced table's primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    pub from: String,
    pub table: String,
    #[serde(default)]
    pub to: Option<String>,
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TableId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnId(pub u32);

/// Index of the descriptor a column was built from:
/// `descriptors[table].columns[column]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DescriptorRef {
    pub table: usize,
    pub column: usize,
}

// ---------------------------------------------------------------------------
// Table / Column
// ---------------------------------------------------------------------------

/// Where a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrigin {
    /// Built from a schema descriptor.
    Schema,
    /// Defined by a `CREATE TABLE` earlier in the same source.
    Created,
    /// Result of a `SELECT`; never reachable by name.
    Derived,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub row_count: Option<u64>,
    pub origin: TableOrigin,
    pub dropped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    /// `None` when the declared type is unknown or could not be inferred.
    pub ty: Option<SqlType>,
    pub table: TableId,
    pub primary_key: bool,
    pub nullable: bool,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub references: Option<ColumnId>,
    pub descriptor: Option<DescriptorRef>,
}

impl Column {
    /// A nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Option<SqlType>, table: TableId) -> Self {
        Self {
            name: name.into(),
            ty,
            table,
            primary_key: false,
            nullable: true,
            not_null: false,
            default_value: None,
            references: None,
            descriptor: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Arena of tables and columns. Table and column lookups both fold ASCII
/// case only; other characters must match exactly.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<Table>,
    columns: Vec<Column>,
    by_name: HashMap<String, Vec<TableId>>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from schema descriptors.
    ///
    /// Columns are created first; foreign keys are linked in a second pass
    /// because a key may point at a table that appears later in the list.
    /// Unparseable column types and dangling keys are logged and skipped.
    #[must_use]
    pub fn from_descriptors(descriptors: &[TableDescriptor]) -> Self {
        let mut catalog = Self::new();
        let mut table_ids = Vec::with_capacity(descriptors.len());

        for (t, desc) in descriptors.iter().enumerate() {
            let table = catalog.add_table(&desc.name, TableOrigin::Schema);
            catalog.tables[table.0 as usize].row_count = desc.row_count;
            for (c, col) in desc.columns.iter().enumerate() {
                let ty = match SqlType::parse(&col.complete_type) {
                    Ok(ty) => Some(ty),
                    Err(err) => {
                        warn!(
                            target: "sqlfront.schema",
                            table = %desc.name,
                            column = %col.name,
                            error = %err,
                            "column type not understood; treating as unknown"
                        );
                        None
                    }
                };
                let mut column = Column::new(&col.name, ty, table);
                column.primary_key = col.primary_key;
                column.not_null = col.not_null;
                column.nullable = !col.not_null && !col.primary_key;
                column.default_value.clone_from(&col.default_value);
                column.descriptor = Some(DescriptorRef { table: t, column: c });
                catalog.add_column(table, column);
            }
            table_ids.push(table);
        }

        for (desc, &table) in descriptors.iter().zip(&table_ids) {
            for fk in &desc.foreign_keys {
                let from = catalog.single_column(table, &fk.from);
                let to = catalog.find_tables(&fk.table).first().copied().and_then(|target| {
                    match &fk.to {
                        Some(name) => catalog.single_column(target, name),
                        None => catalog.primary_key(target),
                    }
                });
                match (from, to) {
                    (Some(from), Some(to)) => catalog.columns[from.0 as usize].references = Some(to),
                    _ => warn!(
                        target: "sqlfront.schema",
                        table = %desc.name,
                        from = %fk.from,
                        references = %fk.table,
                        "dangling foreign key ignored"
                    ),
                }
            }
        }

        debug!(
            target: "sqlfront.schema",
            tables = catalog.tables.len(),
            columns = catalog.columns.len(),
            "catalog built from descriptors"
        );
        catalog
    }

    /// Register a new table. Derived tables are not reachable by name.
    pub fn add_table(&mut self, name: &str, origin: TableOrigin) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(Table {
            name: name.to_owned(),
            columns: Vec::new(),
            row_count: None,
            origin,
            dropped: false,
        });
        if origin != TableOrigin::Derived {
            self.by_name.entry(key(name)).or_default().push(id);
        }
        id
    }

    /// Append `column` to `table`. The column's `table` field is overwritten.
    pub fn add_column(&mut self, table: TableId, mut column: Column) -> ColumnId {
        let id = ColumnId(self.columns.len() as u32);
        column.table = table;
        self.columns.push(column);
        self.tables[table.0 as usize].columns.push(id);
        id
    }

    #[must_use]
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0 as usize]
    }

    #[must_use]
    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.0 as usize]
    }

    pub fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        &mut self.columns[id.0 as usize]
    }

    /// Live tables named `name` (case-insensitive). More than one means the
    /// name is ambiguous.
    #[must_use]
    pub fn find_tables(&self, name: &str) -> &[TableId] {
        self.by_name.get(&key(name)).map_or(&[][..], Vec::as_slice)
    }

    /// Columns of `table` named `name`.
    #[must_use]
    pub fn find_columns(&self, table: TableId, name: &str) -> Vec<ColumnId> {
        self.table(table)
            .columns
            .iter()
            .copied()
            .filter(|&c| self.column(c).name.eq_ignore_ascii_case(name))
            .collect()
    }

    fn single_column(&self, table: TableId, name: &str) -> Option<ColumnId> {
        match self.find_columns(table, name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// First primary-key column of `table`.
    #[must_use]
    pub fn primary_key(&self, table: TableId) -> Option<ColumnId> {
        self.table(table)
            .columns
            .iter()
            .copied()
            .find(|&c| self.column(c).primary_key)
    }

    /// Names of all live, named tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .iter()
            .filter(|t| !t.dropped && t.origin != TableOrigin::Derived)
            .map(|t| t.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Remove `table` from name lookup. Its id stays valid.
    pub fn drop_table(&mut self, table: TableId) {
        let name = key(&self.tables[table.0 as usize].name);
        if let Some(ids) = self.by_name.get_mut(&name) {
            ids.retain(|&id| id != table);
            if ids.is_empty() {
                self.by_name.remove(&name);
            }
        }
        self.tables[table.0 as usize].dropped = true;
    }

    pub fn rename_table(&mut self, table: TableId, new_name: &str) {
        self.drop_table(table);
        let entry = &mut self.tables[table.0 as usize];
        entry.name = new_name.to_owned();
        entry.dropped = false;
        self.by_name.entry(key(new_name)).or_default().push(table);
    }

    /// Detach `column` from its table.
    pub fn remove_column(&mut self, column: ColumnId) {
        let table = self.column(column).table;
        self.tables[table.0 as usize].columns.retain(|&c| c != column);
    }

    pub fn rename_column(&mut self, column: ColumnId, new_name: &str) {
        new_name.clone_into(&mut self.columns[column.0 as usize].name);
    }

    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
