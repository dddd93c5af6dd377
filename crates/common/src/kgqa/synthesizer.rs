//! Answer synthesis
//!
//! Pure functions turning traversal rows into an answer sentence. Frames use
//! `{entity}` and `{items}` placeholders.

use super::intent::Intent;
use crate::graph::{DiseaseProperty, Row, Value};
use indexmap::IndexSet;

/// Separator between list items in answers
pub const ITEM_SEPARATOR: &str = "、";

const GENERIC_MISSING: &str = "抱歉，未能找到{entity}的相关信息。";

enum Template {
    /// Single text property read from the first row
    Scalar(DiseaseProperty),
    /// List property read from the first row, not aggregated
    ListProperty(DiseaseProperty),
    /// Column aggregated over all rows
    List {
        column: &'static str,
        frame: &'static str,
        missing: &'static str,
    },
}

fn template(intent: Intent) -> Option<Template> {
    use super::query_builder::columns::*;

    let list = |column: &'static str, frame: &'static str, missing: &'static str| Template::List {
        column,
        frame,
        missing,
    };

    let template = match intent {
        Intent::Desc
        | Intent::Cause
        | Intent::Prevent
        | Intent::EasyGet
        | Intent::CureLasttime
        | Intent::CuredProb => Template::Scalar(intent.property()?),
        Intent::CureWay => Template::ListProperty(DiseaseProperty::CureWay),

        Intent::Symptom => list(
            SYMPTOM,
            "{entity}的症状包括：{items}。",
            "抱歉，未能找到{entity}的症状信息。",
        ),
        Intent::RecommandDrug => list(
            DRUG,
            "{entity}的推荐药物有：{items}。",
            "抱歉，未能找到{entity}的推荐药物信息。",
        ),
        Intent::CommonDrug => list(
            DRUG,
            "{entity}的常用药物有：{items}。",
            "抱歉，未能找到{entity}的常用药物信息。",
        ),
        Intent::TreatmentDrug => list(
            DRUG,
            "{entity}的治疗药物有：{items}。",
            "抱歉，未能找到{entity}的治疗药物信息。",
        ),
        Intent::NoEat => list(
            FOOD,
            "{entity}的患者应该忌食：{items}。",
            "抱歉，未能找到{entity}的忌食食物信息。",
        ),
        Intent::DoEat => list(
            FOOD,
            "{entity}的患者可以多吃：{items}。",
            "抱歉，未能找到{entity}的宜食食物信息。",
        ),
        Intent::RecommandEat => list(
            FOOD,
            "{entity}的推荐食谱有：{items}。",
            "抱歉，未能找到{entity}的推荐食谱信息。",
        ),
        Intent::NeedCheck => list(
            CHECK,
            "{entity}需要进行的检查有：{items}。",
            "抱歉，未能找到{entity}的检查项目信息。",
        ),
        Intent::Department => list(
            DEPARTMENT,
            "{entity}一般属于：{items}。",
            "抱歉，未能找到{entity}的所属科室信息。",
        ),
        Intent::AcompanyDisease => list(
            DISEASE,
            "{entity}的并发症有：{items}。",
            "抱歉，未能找到{entity}的并发症信息。",
        ),
        Intent::DrugDisease => list(
            DISEASE,
            "{entity}可以治疗：{items}等疾病。",
            "抱歉，未能找到{entity}可治疗的疾病信息。",
        ),
        Intent::DrugProducer => list(
            PRODUCER,
            "{entity}的生产厂家有：{items}。",
            "抱歉，未能找到{entity}的生产厂家信息。",
        ),
        Intent::SymptomDisease => list(
            DISEASE,
            "导致或与“{entity}”相关的疾病有：{items}。",
            "抱歉，未能找到与{entity}相关的疾病信息。",
        ),
        Intent::CheckDisease => list(
            DISEASE,
            "{entity}可以用于诊断：{items}等疾病。",
            "抱歉，未能找到{entity}可诊断的疾病信息。",
        ),
        Intent::DepartmentDisease => list(
            DISEASE,
            "{entity}擅长治疗：{items}等疾病。",
            "抱歉，未能找到{entity}擅长治疗的疾病信息。",
        ),
        Intent::SubDepartment => list(
            DEPARTMENT,
            "{entity}下设的科室有：{items}。",
            "抱歉，未能找到{entity}的下属科室信息。",
        ),
        Intent::ProducerDrug => list(
            DRUG,
            "{entity}生产的药品有：{items}。",
            "抱歉，未能找到{entity}生产的药品信息。",
        ),
        Intent::FoodSuitsDisease => list(
            DISEASE,
            "{entity}适合患有：{items}等疾病的患者食用。",
            "抱歉，未能找到适合食用{entity}的疾病信息。",
        ),
        Intent::FoodAvoidDisease => list(
            DISEASE,
            "{entity}不适合患有：{items}等疾病的患者食用。",
            "抱歉，未能找到需要忌食{entity}的疾病信息。",
        ),

        Intent::Greeting => return None,
    };
    Some(template)
}

/// Fill `{entity}` and `{items}`; the substituted text is never re-scanned
fn render(frame: &str, entity: &str, items: &str) -> String {
    match frame.split_once("{items}") {
        Some((head, tail)) => format!(
            "{}{}{}",
            head.replace("{entity}", entity),
            items,
            tail.replace("{entity}", entity)
        ),
        None => frame.replace("{entity}", entity),
    }
}

fn scalar_missing(property: DiseaseProperty, entity: &str) -> String {
    format!("抱歉，未能找到{}的{}信息。", entity, property.display_name())
}

/// Non-blank items of `column` across `rows`, first-seen order, no repeats
fn collect_items<'a>(rows: &'a [Row], column: &str) -> IndexSet<&'a str> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .flat_map(Value::items)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn join(items: &IndexSet<&str>) -> String {
    items.iter().copied().collect::<Vec<_>>().join(ITEM_SEPARATOR)
}

/// Message used when there is nothing to say about `entity` for `intent`
pub fn empty_answer(intent: &str, entity: &str) -> String {
    let missing = match Intent::parse(intent).and_then(template) {
        Some(Template::Scalar(p)) | Some(Template::ListProperty(p)) => {
            return scalar_missing(p, entity)
        }
        Some(Template::List { missing, .. }) => missing,
        None => GENERIC_MISSING,
    };
    render(missing, entity, "")
}

/// Turn rows into an answer.
///
/// Deterministic: identical inputs always produce identical text.
pub fn synthesize(question: &str, intent: &str, entity: &str, rows: &[Row]) -> String {
    if rows.is_empty() {
        return empty_answer(intent, entity);
    }

    let Some(template) = Intent::parse(intent).and_then(template) else {
        return generic_answer(question, rows);
    };

    match template {
        Template::Scalar(property) => {
            let value = rows[0]
                .get(property.key())
                .map(|v| v.to_string())
                .unwrap_or_default();
            let value = value.trim().trim_end_matches(['。', '.']).trim_end();
            if value.is_empty() {
                scalar_missing(property, entity)
            } else {
                format!("{}的{}是：{}。", entity, property.display_name(), value)
            }
        }
        Template::ListProperty(property) => {
            let items = collect_items(&rows[..1], property.key());
            if items.is_empty() {
                scalar_missing(property, entity)
            } else {
                format!("{}的{}有：{}。", entity, property.display_name(), join(&items))
            }
        }
        Template::List {
            column,
            frame,
            missing,
        } => {
            let items = collect_items(rows, column);
            if items.is_empty() {
                render(missing, entity, "")
            } else {
                render(frame, entity, &join(&items))
            }
        }
    }
}

/// Fallback for intents without a template: every column of every row
pub fn generic_answer(question: &str, rows: &[Row]) -> String {
    let mut lines = vec![format!("关于“{}”，我找到以下信息：", question.trim())];
    for row in rows {
        for (key, value) in row {
            lines.push(format!("{}: {}", key, value));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(column: &str, values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert(column.to_string(), Value::from(*v));
                row
            })
            .collect()
    }

    #[test]
    fn test_symptom_list_in_first_seen_order() {
        let answer = synthesize(
            "感冒有什么症状？",
            "查询症状",
            "感冒",
            &rows("symptom", &["咳嗽", "发热"]),
        );
        assert_eq!(answer, "感冒的症状包括：咳嗽、发热。");
    }

    #[test]
    fn test_duplicates_listed_once() {
        let answer = synthesize(
            "感冒吃什么药？",
            "查询常用药物",
            "感冒",
            &rows("drug_name", &["布洛芬", "感冒灵", "布洛芬"]),
        );
        assert_eq!(answer, "感冒的常用药物有：布洛芬、感冒灵。");
        assert_eq!(answer.matches("布洛芬").count(), 1);
    }

    #[test]
    fn test_empty_rows_name_the_entity() {
        let answer = synthesize("阿司匹林是哪个厂生产的？", "查询药物生产厂家", "阿司匹林", &[]);
        assert_eq!(answer, "抱歉，未能找到阿司匹林的生产厂家信息。");

        let unknown = synthesize("？", "查询病毒载量", "感冒", &[]);
        assert_eq!(unknown, "抱歉，未能找到感冒的相关信息。");
    }

    #[test]
    fn test_scalar_property() {
        let answer = synthesize("感冒的病因是什么？", "查询病因", "感冒", &rows("cause", &["病毒感染。"]));
        assert_eq!(answer, "感冒的病因是：病毒感染。");
    }

    #[test]
    fn test_scalar_property_missing_column() {
        let answer = synthesize("？", "query_prevent", "感冒", &rows("cause", &["病毒感染"]));
        assert_eq!(answer, "抱歉，未能找到感冒的预防方法信息。");
    }

    #[test]
    fn test_cure_way_reads_first_row_only() {
        let mut first = Row::new();
        first.insert(
            "cure_way".into(),
            Value::List(vec!["药物治疗".into(), "支持性治疗".into(), "药物治疗".into()]),
        );
        let mut second = Row::new();
        second.insert("cure_way".into(), Value::List(vec!["手术治疗".into()]));

        let answer = synthesize("感冒怎么治？", "查询治疗方法", "感冒", &[first, second]);
        assert_eq!(answer, "感冒的治疗方法有：药物治疗、支持性治疗。");
    }

    #[test]
    fn test_generic_fallback() {
        let answer = synthesize(
            "感冒的病毒载量高吗？",
            "查询病毒载量",
            "感冒",
            &rows("viral_load", &["low"]),
        );
        assert!(answer.contains("感冒的病毒载量高吗？"));
        assert!(answer.contains("viral_load: low"));
    }

    #[test]
    fn test_generic_fallback_joins_lists() {
        let mut row = Row::new();
        row.insert("tags".into(), Value::List(vec!["a".into(), "b".into()]));
        let answer = generic_answer("q", &[row]);
        assert_eq!(answer, "关于“q”，我找到以下信息：\ntags: a、b");
    }

    #[test]
    fn test_render_does_not_rescan_items() {
        assert_eq!(render("{entity}:{items}", "A", "{entity}"), "A:{entity}");
    }

    #[test]
    fn test_every_template_intent_has_missing_message() {
        for intent in Intent::ALL {
            if intent == Intent::Greeting {
                continue;
            }
            let msg = empty_answer(intent.label(), "某实体");
            assert!(msg.contains("某实体"), "{}", intent);
            assert!(msg.starts_with("抱歉"), "{}", intent);
        }
    }

    #[test]
    fn test_deterministic() {
        let input = rows("symptom", &["咳嗽", "发热", "咳嗽"]);
        let a = synthesize("q", "查询症状", "感冒", &input);
        let b = synthesize("q", "查询症状", "感冒", &input);
        assert_eq!(a, b);
    }
}
