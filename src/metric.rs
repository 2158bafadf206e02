// src/metric.rs
//! Таблица показателя по провинциям
//!
//! Хранит для каждого идентификатора провинции название и значение показателя.
//! Значение может отсутствовать (пустая ячейка CSV): такая провинция потом
//! получает нейтральную серую заливку.
//!
//! Статистика (`min`, `max`, `mean`) считается по всем строкам таблицы, а не
//! только по провинциям, которые встретились в геометрии.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Serialize;

use crate::config::ColumnSettings;
use crate::error::{MapError, Result};

/// Одна строка таблицы
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub id: u32,
    pub name: String,
    pub value: Option<f64>,
}

/// Строки таблицы в порядке файла и индекс по идентификатору провинции.
///
/// При повторе идентификатора поиск возвращает первую строку, а статистика
/// учитывает все строки, включая повторы.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    rows: Vec<MetricRecord>,
    by_id: BTreeMap<u32, usize>,
}

impl MetricTable {
    /// Строит таблицу из готовых записей
    pub fn from_records(records: impl IntoIterator<Item = MetricRecord>) -> Self {
        let rows: Vec<MetricRecord> = records.into_iter().collect();
        let mut by_id = BTreeMap::new();
        for (index, record) in rows.iter().enumerate() {
            by_id.entry(record.id).or_insert(index);
        }
        Self { rows, by_id }
    }

    /// Читает таблицу из CSV-файла с заголовком
    pub fn from_csv_path(path: impl AsRef<Path>, columns: &ColumnSettings) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file, columns)
    }

    /// Читает таблицу из CSV; колонки ищутся по именам из `columns`.
    ///
    /// Пустая ячейка значения даёт запись без показателя.
    pub fn from_csv_reader<R: Read>(reader: R, columns: &ColumnSettings) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| MapError::MissingColumn(name.to_string()))
        };
        let id_col = column(&columns.id)?;
        let name_col = column(&columns.name)?;
        let value_col = column(&columns.value)?;

        let mut records = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or_default();
            let invalid = |col: &str, value: &str| MapError::InvalidValue {
                row: row + 1,
                column: col.to_string(),
                value: value.to_string(),
            };

            let raw_id = field(id_col);
            let id = parse_id(raw_id).ok_or_else(|| invalid(columns.id.as_str(), raw_id))?;

            let raw_value = field(value_col);
            let value = if raw_value.is_empty() {
                None
            } else {
                Some(
                    raw_value
                        .parse::<f64>()
                        .map_err(|_| invalid(columns.value.as_str(), raw_value))?,
                )
            };

            records.push(MetricRecord {
                id,
                name: field(name_col).to_string(),
                value,
            });
        }

        tracing::debug!(rows = records.len(), "таблица показателя прочитана");
        Ok(Self::from_records(records))
    }

    /// Число строк, включая повторы идентификаторов
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Строки в порядке файла
    pub fn records(&self) -> impl Iterator<Item = &MetricRecord> {
        self.rows.iter()
    }

    fn record(&self, id: u32) -> Option<&MetricRecord> {
        self.by_id.get(&id).map(|&index| &self.rows[index])
    }

    /// Значение показателя провинции (если оно есть)
    #[must_use]
    pub fn get(&self, id: u32) -> Option<f64> {
        self.record(id).and_then(|r| r.value)
    }

    /// Название провинции
    #[must_use]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.record(id).map(|r| r.name.as_str())
    }

    /// Все имеющиеся значения показателя по всем строкам
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(|r| r.value)
    }

    /// Глобальные минимум и максимум
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Среднее арифметическое всех значений
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self.values().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Идентификатор допускается как `"3"`, так и `"3.0"`
pub(crate) fn parse_id(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u32>() {
        return Some(id);
    }
    let float = raw.parse::<f64>().ok()?;
    float_to_id(float)
}

pub(crate) fn float_to_id(value: f64) -> Option<u32> {
    (value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX)).then(|| value as u32)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{MetricRecord, MetricTable};

    /// Таблица HDI провинций Непала
    pub(crate) fn nepal_provinces() -> MetricTable {
        let rows = [
            (1, "Koshi", 0.580),
            (2, "Madhesh", 0.519),
            (3, "Bagmati", 0.669),
            (4, "Gandaki", 0.621),
            (5, "Lumbini", 0.563),
            (6, "Karnali", 0.538),
            (7, "Sudurpaschim", 0.547),
        ];
        MetricTable::from_records(rows.into_iter().map(|(id, name, value)| MetricRecord {
            id,
            name: name.to_string(),
            value: Some(value),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_average_matches_hand_computation() {
        let table = fixtures::nepal_provinces();
        let mean = table.mean().unwrap();
        // 4.037 / 7
        assert!((mean - 0.576_714_285).abs() < 1e-6);
        assert_eq!(format!("{mean:.3}"), "0.577");
        assert_eq!(table.min_max(), Some((0.519, 0.669)));
    }

    #[test]
    fn reads_csv_with_default_columns() {
        let csv = "Province,Pname,HDI\n1,Koshi,0.580\n2,Madhesh,\n3.0,Bagmati, 0.669\n";
        let table = MetricTable::from_csv_reader(csv.as_bytes(), &ColumnSettings::default())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some(0.58));
        assert_eq!(table.get(2), None);
        assert_eq!(table.name(2), Some("Madhesh"));
        assert_eq!(table.get(3), Some(0.669));
        assert_eq!(table.get(9), None);
        assert!((table.mean().unwrap() - (0.58 + 0.669) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Province,Name,HDI\n1,Koshi,0.580\n";
        let err = MetricTable::from_csv_reader(csv.as_bytes(), &ColumnSettings::default())
            .unwrap_err();
        assert!(matches!(err, MapError::MissingColumn(ref c) if c == "Pname"));
    }

    #[test]
    fn bad_value_names_row_and_column() {
        let csv = "Province,Pname,HDI\n1,Koshi,high\n";
        let err = MetricTable::from_csv_reader(csv.as_bytes(), &ColumnSettings::default())
            .unwrap_err();
        assert!(matches!(err, MapError::InvalidValue { row: 1, ref column, .. } if column == "HDI"));
    }

    #[test]
    fn first_duplicate_wins_but_all_rows_count_in_statistics() {
        let csv = "Province,Pname,HDI\n4,Gandaki,0.621\n4,Old,0.1\n1,Koshi,0.580\n";
        let table = MetricTable::from_csv_reader(csv.as_bytes(), &ColumnSettings::default())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(4), Some(0.621));
        assert_eq!(table.name(4), Some("Gandaki"));
        assert_eq!(table.min_max(), Some((0.1, 0.621)));
        assert!((table.mean().unwrap() - (0.621 + 0.1 + 0.58) / 3.0).abs() < 1e-12);
        let ids: Vec<u32> = table.records().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 4, 1]);
    }

    #[test]
    fn empty_table_has_no_statistics() {
        let table = MetricTable::default();
        assert!(table.is_empty());
        assert_eq!(table.mean(), None);
        assert_eq!(table.min_max(), None);
    }

    #[test]
    fn ids_accept_integral_floats_only() {
        assert_eq!(parse_id("7"), Some(7));
        assert_eq!(parse_id("7.0"), Some(7));
        assert_eq!(parse_id("7.5"), None);
        assert_eq!(parse_id("-1"), None);
        assert_eq!(parse_id("seven"), None);
    }
}
