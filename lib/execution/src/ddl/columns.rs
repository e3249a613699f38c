use super::DdlError;
use catalog::{BoundColumn, IndexColumn, Table};
use std::collections::HashSet;

/// Binds column references to the columns of a table.
pub struct ColumnMapper;

impl ColumnMapper {
    /// Resolves `columns` against the table's current column list, keeping
    /// their order and sort modifiers. Stops at the first unknown column.
    ///
    /// Callers hold the table's exclusive lock so the column list cannot
    /// change between binding and registration.
    pub fn bind(table: &Table, columns: &[IndexColumn]) -> Result<Vec<BoundColumn>, DdlError> {
        if columns.is_empty() {
            return Err(DdlError::InvalidIndexType(format!(
                "an index on \"{}\" needs at least one column",
                table.name()
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        columns
            .iter()
            .map(|reference| {
                let name = reference.column_name();
                if !seen.insert(name.as_str()) {
                    return Err(DdlError::InvalidIndexType(format!(
                        "column \"{name}\" appears more than once"
                    )));
                }
                let (position, column) =
                    table
                        .find_column(name)
                        .ok_or_else(|| DdlError::UnresolvedColumn {
                            column: name.clone(),
                            table: table.name().clone(),
                        })?;
                Ok(BoundColumn::new(column, position, reference.sort_order()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Column, Database, SortOrder, TableDefinition, TableRef};
    use common::{DbConfig, StorageMode};
    use pretty_assertions_sorted::assert_eq;
    use ty::DataTypeKind;

    fn table() -> TableRef {
        let database = Database::new(
            &DbConfig::builder()
                .database("test")
                .mode(StorageMode::Memory)
                .build(),
        );
        database
            .create_table(
                &database.main_schema(),
                TableDefinition::builder()
                    .name("T")
                    .columns(vec![
                        Column::new("A", DataTypeKind::Integer),
                        Column::new("B", DataTypeKind::VarChar),
                        Column::new("C", DataTypeKind::Boolean),
                    ])
                    .build(),
            )
            .unwrap()
    }

    #[test]
    fn test_bind_preserves_order_and_sort() {
        let table = table();
        let bound = ColumnMapper::bind(
            &table,
            &[
                IndexColumn::new("C").with_sort_order(SortOrder::descending()),
                IndexColumn::new("A"),
            ],
        )
        .unwrap();

        assert_eq!(
            bound
                .iter()
                .map(|column| (column.position(), column.to_string()))
                .collect::<Vec<_>>(),
            vec![(2, "C DESC".to_string()), (0, "A".to_string())]
        );
    }

    #[test]
    fn test_first_unknown_column_fails() {
        let table = table();
        let result = ColumnMapper::bind(
            &table,
            &[
                IndexColumn::new("A"),
                IndexColumn::new("X"),
                IndexColumn::new("Y"),
            ],
        );
        assert_eq!(
            result,
            Err(DdlError::UnresolvedColumn {
                column: "X".into(),
                table: "T".into()
            })
        );
    }

    #[test]
    fn test_sees_columns_added_later() {
        let table = table();
        table
            .add_column(Column::new("D", DataTypeKind::Integer))
            .unwrap();
        assert!(ColumnMapper::bind(&table, &[IndexColumn::new("D")]).is_ok());
    }

    #[test]
    fn test_empty_and_repeated_lists_rejected() {
        let table = table();
        assert!(matches!(
            ColumnMapper::bind(&table, &[]),
            Err(DdlError::InvalidIndexType(_))
        ));
        assert!(matches!(
            ColumnMapper::bind(&table, &[IndexColumn::new("A"), IndexColumn::new("A")]),
            Err(DdlError::InvalidIndexType(_))
        ));
    }
}
