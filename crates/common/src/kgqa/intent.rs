//! Intent catalogue
//!
//! Every intent the engine can answer has a canonical Chinese label (what
//! the classifier emits) and a few English aliases. Labels outside the
//! catalogue stay raw strings and take the unsupported / generic paths.

use crate::graph::DiseaseProperty;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    // Disease properties
    Desc,
    Cause,
    Prevent,
    EasyGet,
    CureLasttime,
    CuredProb,
    CureWay,

    // Disease relations
    Symptom,
    RecommandDrug,
    CommonDrug,
    TreatmentDrug,
    NoEat,
    DoEat,
    RecommandEat,
    NeedCheck,
    Department,
    AcompanyDisease,

    // Reverse lookups
    DrugDisease,
    DrugProducer,
    SymptomDisease,
    CheckDisease,
    DepartmentDisease,
    SubDepartment,
    ProducerDrug,
    FoodSuitsDisease,
    FoodAvoidDisease,

    Greeting,
}

impl Intent {
    pub const ALL: [Intent; 27] = [
        Intent::Desc,
        Intent::Cause,
        Intent::Prevent,
        Intent::EasyGet,
        Intent::CureLasttime,
        Intent::CuredProb,
        Intent::CureWay,
        Intent::Symptom,
        Intent::RecommandDrug,
        Intent::CommonDrug,
        Intent::TreatmentDrug,
        Intent::NoEat,
        Intent::DoEat,
        Intent::RecommandEat,
        Intent::NeedCheck,
        Intent::Department,
        Intent::AcompanyDisease,
        Intent::DrugDisease,
        Intent::DrugProducer,
        Intent::SymptomDisease,
        Intent::CheckDisease,
        Intent::DepartmentDisease,
        Intent::SubDepartment,
        Intent::ProducerDrug,
        Intent::FoodSuitsDisease,
        Intent::FoodAvoidDisease,
        Intent::Greeting,
    ];

    /// Canonical label as emitted by the intent classifier
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Desc => "查询疾病描述",
            Intent::Cause => "查询病因",
            Intent::Prevent => "查询预防方法",
            Intent::EasyGet => "查询易感人群",
            Intent::CureLasttime => "查询治疗持续时间",
            Intent::CuredProb => "查询治愈概率",
            Intent::CureWay => "查询治疗方法",
            Intent::Symptom => "查询症状",
            Intent::RecommandDrug => "查询推荐药物",
            Intent::CommonDrug => "查询常用药物",
            Intent::TreatmentDrug => "查询治疗药物",
            Intent::NoEat => "查询忌食食物",
            Intent::DoEat => "查询宜食食物",
            Intent::RecommandEat => "查询推荐食谱",
            Intent::NeedCheck => "查询推荐检查",
            Intent::Department => "查询所属科室",
            Intent::AcompanyDisease => "查询并发症",
            Intent::DrugDisease => "查询药物治疗疾病",
            Intent::DrugProducer => "查询药物生产厂家",
            Intent::SymptomDisease => "查询症状相关疾病",
            Intent::CheckDisease => "查询检查诊断疾病",
            Intent::DepartmentDisease => "查询科室擅长疾病",
            Intent::SubDepartment => "查询下属科室",
            Intent::ProducerDrug => "查询生产药品",
            Intent::FoodSuitsDisease => "查询食物宜食疾病",
            Intent::FoodAvoidDisease => "查询食物忌食疾病",
            Intent::Greeting => "问候",
        }
    }

    /// Alternative spellings, matched case-insensitively
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Intent::Desc => &["query_desc", "query_description"],
            Intent::Cause => &["query_cause"],
            Intent::Prevent => &["query_prevent"],
            Intent::EasyGet => &["query_easy_get"],
            Intent::CureLasttime => &["query_cure_lasttime"],
            Intent::CuredProb => &["query_cured_prob"],
            Intent::CureWay => &["query_cure_way"],
            Intent::Symptom => &["query_symptom", "query_symptoms"],
            Intent::RecommandDrug => &["query_recommand_drug"],
            Intent::CommonDrug => &["query_common_drug"],
            Intent::TreatmentDrug => &["查询药物", "query_drug", "query_treatment_drug"],
            Intent::NoEat => &["query_no_eat"],
            Intent::DoEat => &["query_do_eat"],
            Intent::RecommandEat => &["query_recommand_eat"],
            Intent::NeedCheck => &["查询所需检查", "query_need_check"],
            Intent::Department => &["query_belongs_to_department", "query_department"],
            Intent::AcompanyDisease => &["query_acompany_disease", "query_acompany_with"],
            Intent::DrugDisease => &["query_drug_effect_disease"],
            Intent::DrugProducer => &["query_drug_producer"],
            Intent::SymptomDisease => &["查询导致疾病", "query_symptom_disease"],
            Intent::CheckDisease => &["query_check_diagnose_disease"],
            Intent::DepartmentDisease => &["query_department_disease"],
            Intent::SubDepartment => &["query_department_subdepartment"],
            Intent::ProducerDrug => &["query_producer_drug"],
            Intent::FoodSuitsDisease => &["query_food_do_eat_disease"],
            Intent::FoodAvoidDisease => &["query_food_no_eat_disease"],
            Intent::Greeting => &["greeting", "greet", "hello"],
        }
    }

    /// Resolve a raw classifier label
    pub fn parse(raw: &str) -> Option<Intent> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Intent::ALL.into_iter().find(|intent| {
            intent.label() == raw
                || intent
                    .aliases()
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(raw))
        })
    }

    /// Disease property read by scalar intents
    pub fn property(&self) -> Option<DiseaseProperty> {
        let property = match self {
            Intent::Desc => DiseaseProperty::Desc,
            Intent::Cause => DiseaseProperty::Cause,
            Intent::Prevent => DiseaseProperty::Prevent,
            Intent::EasyGet => DiseaseProperty::EasyGet,
            Intent::CureLasttime => DiseaseProperty::CureLasttime,
            Intent::CuredProb => DiseaseProperty::CuredProb,
            Intent::CureWay => DiseaseProperty::CureWay,
            _ => return None,
        };
        Some(property)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_canonical_and_alias() {
        assert_eq!(Intent::parse("查询症状"), Some(Intent::Symptom));
        assert_eq!(Intent::parse("QUERY_SYMPTOM"), Some(Intent::Symptom));
        assert_eq!(Intent::parse(" query_drug_producer "), Some(Intent::DrugProducer));
        assert_eq!(Intent::parse("查询导致疾病"), Some(Intent::SymptomDisease));
        assert_eq!(Intent::parse("greeting"), Some(Intent::Greeting));
    }

    #[test]
    fn test_unknown_labels() {
        assert_eq!(Intent::parse("查询病毒载量"), None);
        assert_eq!(Intent::parse(""), None);
    }

    #[test]
    fn test_labels_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for intent in Intent::ALL {
            assert!(seen.insert(intent.label().to_lowercase()), "{}", intent.label());
            for alias in intent.aliases() {
                assert!(seen.insert(alias.to_lowercase()), "{}", alias);
            }
        }
    }

    #[test]
    fn test_every_label_parses_back() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.label()), Some(intent));
        }
    }

    #[test]
    fn test_scalar_intents_have_properties() {
        assert_eq!(Intent::Cause.property(), Some(DiseaseProperty::Cause));
        assert_eq!(Intent::CureWay.property(), Some(DiseaseProperty::CureWay));
        assert_eq!(Intent::Symptom.property(), None);
    }
}
