use std::collections::HashSet;

use super::KnowledgeError;

/// One row of the disease/symptom matrix: a disease and the symptom
/// columns marked present. A disease may appear in several rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DiseasePattern {
    pub disease: String,
    pub symptoms: Vec<String>,
}

/// Binary disease-symptom dataset. Column names are matched exactly.
#[derive(Debug, Clone, Default)]
pub struct SymptomMatrix {
    columns: Vec<String>,
    column_set: HashSet<String>,
    patterns: Vec<DiseasePattern>,
}

impl SymptomMatrix {
    /// Parse CSV with a `diseases` first column followed by 0/1 symptom columns.
    pub fn parse(csv: &str) -> Result<Self, KnowledgeError> {
        let mut lines = csv
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next().ok_or(KnowledgeError::Empty("symptom matrix"))?;
        let header = split_csv_line(header);
        if header.first().map(|h| h.trim().to_lowercase()) != Some("diseases".to_string()) {
            return Err(KnowledgeError::Csv {
                line: 1,
                reason: "first column must be 'diseases'".into(),
            });
        }
        let columns: Vec<String> = header[1..].iter().map(|c| c.trim().to_lowercase()).collect();

        let mut patterns = Vec::new();
        for (idx, line) in lines {
            let fields = split_csv_line(line);
            if fields.len() != columns.len() + 1 {
                return Err(KnowledgeError::Csv {
                    line: idx + 1,
                    reason: format!("expected {} fields, found {}", columns.len() + 1, fields.len()),
                });
            }
            let disease = fields[0].trim().to_string();
            if disease.is_empty() {
                continue;
            }
            let symptoms = columns
                .iter()
                .zip(&fields[1..])
                .filter(|(_, v)| is_present(v))
                .map(|(c, _)| c.clone())
                .collect();
            patterns.push(DiseasePattern { disease, symptoms });
        }

        if patterns.is_empty() {
            return Err(KnowledgeError::Empty("symptom matrix"));
        }

        let column_set = columns.iter().cloned().collect();
        Ok(Self {
            columns,
            column_set,
            patterns,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn patterns(&self) -> &[DiseasePattern] {
        &self.patterns
    }

    pub fn has_column(&self, symptom: &str) -> bool {
        self.column_set.contains(symptom)
    }
}

fn is_present(value: &str) -> bool {
    matches!(value.trim(), "1" | "1.0" | "true" | "True")
}

/// Split one CSV line, honouring double-quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
