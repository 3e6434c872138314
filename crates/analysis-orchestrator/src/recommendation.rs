use analysis_core::TrendBias;
use quant_analysis::OptionType;
use serde::{Deserialize, Serialize};
use technical_analysis::TechnicalLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationKind {
    #[serde(rename = "Compra Forte de CALL")]
    StrongBuyCall,
    #[serde(rename = "Compra de CALL")]
    BuyCall,
    #[serde(rename = "Compra Forte de PUT")]
    StrongBuyPut,
    #[serde(rename = "Compra de PUT")]
    BuyPut,
    #[serde(rename = "Aguardar (Conflito)")]
    WaitConflict,
    #[serde(rename = "Não Recomendado")]
    NotRecommended,
}

impl RecommendationKind {
    pub fn to_label(&self) -> &'static str {
        match self {
            RecommendationKind::StrongBuyCall => "Compra Forte de CALL",
            RecommendationKind::BuyCall => "Compra de CALL",
            RecommendationKind::StrongBuyPut => "Compra Forte de PUT",
            RecommendationKind::BuyPut => "Compra de PUT",
            RecommendationKind::WaitConflict => "Aguardar (Conflito)",
            RecommendationKind::NotRecommended => "Não Recomendado",
        }
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub rationale: String,
}

/// The signals the synthesizer reconciles for one option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    pub fundamental_bias: TrendBias,
    pub daily_label: TechnicalLabel,
    pub weekly_bias: TrendBias,
}

/// Reconcile the fundamental, daily-technical and weekly views for one option.
///
/// A CALL wants Alta everywhere, a PUT wants Baixa everywhere. Full agreement
/// plus an underpriced option is the strong case; agreement with a weekly
/// view that is merely not against the trade is the plain case; a fundamental
/// view contradicted by the daily signal is a conflict.
pub fn synthesize(
    option_type: OptionType,
    underpriced: bool,
    signals: &SignalContext,
) -> Recommendation {
    let SignalContext {
        fundamental_bias,
        daily_label,
        weekly_bias,
    } = *signals;

    let (bias, against, technical_with, technical_against) = match option_type {
        OptionType::Call => (
            TrendBias::Up,
            TrendBias::Down,
            daily_label.is_buy(),
            daily_label.is_sell(),
        ),
        OptionType::Put => (
            TrendBias::Down,
            TrendBias::Up,
            daily_label.is_sell(),
            daily_label.is_buy(),
        ),
    };

    let kind = if fundamental_bias == bias && technical_with && weekly_bias == bias && underpriced {
        match option_type {
            OptionType::Call => RecommendationKind::StrongBuyCall,
            OptionType::Put => RecommendationKind::StrongBuyPut,
        }
    } else if fundamental_bias == bias && technical_with && weekly_bias != against {
        match option_type {
            OptionType::Call => RecommendationKind::BuyCall,
            OptionType::Put => RecommendationKind::BuyPut,
        }
    } else if fundamental_bias == bias && technical_against {
        RecommendationKind::WaitConflict
    } else {
        RecommendationKind::NotRecommended
    };

    Recommendation {
        kind,
        rationale: rationale(kind, option_type).to_string(),
    }
}

fn rationale(kind: RecommendationKind, option_type: OptionType) -> &'static str {
    match (kind, option_type) {
        (RecommendationKind::StrongBuyCall, _) => {
            "Convergência total: o ativo está subvalorizado (fundamental), a tendência \
             semanal é de alta, o sinal técnico diário é de compra e esta opção está \
             barata. Cenário ideal para uma compra de CALL."
        }
        (RecommendationKind::BuyCall, _) => {
            "Sinais alinhados: os vieses fundamentalista e técnico são de alta, com \
             tendência semanal favorável. Boa oportunidade para uma compra de CALL."
        }
        (RecommendationKind::StrongBuyPut, _) => {
            "Convergência total: o ativo está sobrevalorizado (fundamental), a tendência \
             semanal é de baixa, o sinal técnico diário é de venda e esta opção está \
             barata. Cenário ideal para uma compra de PUT."
        }
        (RecommendationKind::BuyPut, _) => {
            "Sinais alinhados: os vieses fundamentalista e técnico são de baixa, com \
             tendência semanal favorável. Boa oportunidade para uma compra de PUT."
        }
        (RecommendationKind::WaitConflict, OptionType::Call) => {
            "Sinais conflitantes: o ativo está subvalorizado no longo prazo, mas a \
             tendência técnica de curto prazo é de baixa. Aguarde a reversão da tendência \
             técnica antes de comprar uma CALL."
        }
        (RecommendationKind::WaitConflict, OptionType::Put) => {
            "Sinais conflitantes: o ativo está sobrevalorizado no longo prazo, mas a \
             tendência técnica de curto prazo é de alta. Aguarde a reversão da tendência \
             técnica antes de comprar uma PUT."
        }
        (RecommendationKind::NotRecommended, OptionType::Call) => {
            "Operação não recomendada: os sinais fundamentalista, técnico ou de tendência \
             semanal não sustentam uma estratégia de alta com esta CALL no momento."
        }
        (RecommendationKind::NotRecommended, OptionType::Put) => {
            "Operação não recomendada: os sinais fundamentalista, técnico ou de tendência \
             semanal não sustentam uma estratégia de baixa com esta PUT no momento."
        }
    }
}
