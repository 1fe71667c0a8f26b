//! Typed parsing of raw form text. Ids, dates and times arrive as strings from
//! the front-end; a blank or unparseable value is reported as a
//! `ValidationError` instead of being coerced to a placeholder id.

use chrono::NaiveDate;

use crate::dates::{format_date, format_time, parse_date, parse_time};
use crate::error::ValidationError;
use crate::models::{
    Agendamento, AgendamentoBase, AgendamentoDraft, Id, ResourceDraft, ResourceKind,
};

/// Raw agendamento form fields. `datas` holds one entry per date input; blank
/// entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendamentoInput {
    pub oficina_id: String,
    pub educador_id: String,
    pub turma_id: String,
    pub hora_inicio: String,
    pub hora_fim: String,
    pub observacoes: String,
    pub datas: Vec<String>,
}

impl AgendamentoInput {
    /// Prefill from an existing record, as the edit form does.
    pub fn from_agendamento(agendamento: &Agendamento) -> Self {
        Self {
            oficina_id: agendamento.oficina_id.to_string(),
            educador_id: agendamento.educador_id.to_string(),
            turma_id: agendamento.turma_id.to_string(),
            hora_inicio: format_time(agendamento.hora_inicio),
            hora_fim: format_time(agendamento.hora_fim),
            observacoes: agendamento.observacoes.clone().unwrap_or_default(),
            datas: vec![format_date(agendamento.data)],
        }
    }

    /// Parse the fields shared by every date. Presence of all required fields
    /// is checked before any of them is parsed.
    pub fn parse_base(&self) -> Result<AgendamentoBase, ValidationError> {
        let required = [
            ("oficina", &self.oficina_id),
            ("educador", &self.educador_id),
            ("turma", &self.turma_id),
            ("hora de início", &self.hora_inicio),
            ("hora de fim", &self.hora_fim),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ValidationError::MissingField(field));
        }

        Ok(AgendamentoBase {
            oficina_id: parse_id("oficina", &self.oficina_id)?,
            educador_id: parse_id("educador", &self.educador_id)?,
            turma_id: parse_id("turma", &self.turma_id)?,
            hora_inicio: parse_time(&self.hora_inicio).ok_or_else(|| {
                malformed("hora de início", &self.hora_inicio)
            })?,
            hora_fim: parse_time(&self.hora_fim)
                .ok_or_else(|| malformed("hora de fim", &self.hora_fim))?,
            observacoes: optional_text(&self.observacoes),
        })
    }

    /// Parse every non-blank date entry. An empty result is not an error here;
    /// the store decides that.
    pub fn parse_dates(&self) -> Result<Vec<NaiveDate>, ValidationError> {
        self.datas
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_date(raw).ok_or_else(|| malformed("data", raw)))
            .collect()
    }

    /// Split a comma or whitespace separated list of dates into entries.
    pub fn set_dates_from_list(&mut self, list: &str) {
        self.datas = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Parse the form as an update of record `id`. Exactly one date is expected.
    pub fn parse_update(&self, id: Id) -> Result<Agendamento, ValidationError> {
        let base = self.parse_base()?;
        let mut dates = self.parse_dates()?;
        if dates.len() > 1 {
            return Err(malformed("data", &self.datas.join(", ")));
        }
        let data = dates.pop().ok_or(ValidationError::MissingField("data"))?;
        Ok(Agendamento::from_draft(id, AgendamentoDraft { base, data }))
    }
}

/// Raw resource form fields. `email` and `telefone` only apply to educadores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInput {
    pub nome: String,
    pub email: String,
    pub telefone: String,
}

impl ResourceInput {
    pub fn from_draft(draft: &ResourceDraft) -> Self {
        match draft {
            ResourceDraft::Educador {
                nome,
                email,
                telefone,
            } => Self {
                nome: nome.clone(),
                email: email.clone().unwrap_or_default(),
                telefone: telefone.clone().unwrap_or_default(),
            },
            other => Self {
                nome: other.nome().to_string(),
                ..Self::default()
            },
        }
    }

    pub fn parse(&self, kind: ResourceKind) -> Result<ResourceDraft, ValidationError> {
        let nome = self.nome.trim();
        if nome.is_empty() {
            return Err(ValidationError::MissingField("nome"));
        }
        let nome = nome.to_string();
        Ok(match kind {
            ResourceKind::Oficina => ResourceDraft::Oficina { nome },
            ResourceKind::Educador => ResourceDraft::Educador {
                nome,
                email: optional_text(&self.email),
                telefone: optional_text(&self.telefone),
            },
            ResourceKind::Turma => ResourceDraft::Turma { nome },
        })
    }
}

/// Parse a positive identifier.
pub fn parse_id(field: &'static str, raw: &str) -> Result<Id, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    match trimmed.parse::<Id>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(malformed(field, raw)),
    }
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn malformed(field: &'static str, raw: &str) -> ValidationError {
    ValidationError::Malformed {
        field,
        value: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> AgendamentoInput {
        AgendamentoInput {
            oficina_id: "1".into(),
            educador_id: "2".into(),
            turma_id: "3".into(),
            hora_inicio: "09:00".into(),
            hora_fim: "10:30".into(),
            observacoes: "  ".into(),
            datas: vec!["2024-06-12".into(), "".into(), " 2024-06-19 ".into()],
        }
    }

    #[test]
    fn parses_a_complete_form() {
        let input = filled();
        let base = input.parse_base().unwrap();
        assert_eq!(
            (base.oficina_id, base.educador_id, base.turma_id),
            (1, 2, 3)
        );
        assert_eq!(base.observacoes, None);
        assert_eq!(input.parse_dates().unwrap().len(), 2);
    }

    #[test]
    fn non_numeric_id_is_rejected_instead_of_becoming_zero() {
        let mut input = filled();
        input.educador_id = "abc".into();
        assert_eq!(
            input.parse_base(),
            Err(ValidationError::Malformed {
                field: "educador",
                value: "abc".into()
            })
        );
        assert!(matches!(
            parse_id("turma", "0"),
            Err(ValidationError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_field_wins_over_malformed_field() {
        let mut input = filled();
        input.oficina_id = "x".into();
        input.hora_fim = " ".into();
        assert_eq!(
            input.parse_base(),
            Err(ValidationError::MissingField("hora de fim"))
        );
    }

    #[test]
    fn malformed_date_entry_is_reported() {
        let mut input = filled();
        input.datas.push("12/06/2024".into());
        assert!(matches!(
            input.parse_dates(),
            Err(ValidationError::Malformed { field: "data", .. })
        ));
    }

    #[test]
    fn date_list_splits_on_commas_and_spaces() {
        let mut input = AgendamentoInput::default();
        input.set_dates_from_list("2024-06-12, 2024-06-19 2024-06-26,");
        assert_eq!(input.datas.len(), 3);
    }

    #[test]
    fn update_requires_a_single_date() {
        let input = filled();
        assert!(input.parse_update(9).is_err());

        let mut single = filled();
        single.datas = vec!["2024-06-12".into()];
        let record = single.parse_update(9).unwrap();
        assert_eq!(record.id, 9);
        assert_eq!(AgendamentoInput::from_agendamento(&record).datas, vec!["2024-06-12"]);
    }

    #[test]
    fn resource_form_requires_a_name_and_drops_blank_contacts() {
        let blank = ResourceInput::default();
        assert_eq!(
            blank.parse(ResourceKind::Turma),
            Err(ValidationError::MissingField("nome"))
        );

        let input = ResourceInput {
            nome: " Ana ".into(),
            email: "".into(),
            telefone: "5555".into(),
        };
        assert_eq!(
            input.parse(ResourceKind::Educador).unwrap(),
            ResourceDraft::Educador {
                nome: "Ana".into(),
                email: None,
                telefone: Some("5555".into()),
            }
        );
    }
}
