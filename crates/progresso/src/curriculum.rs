//! The static study plan that seeds a fresh progress state.

use crate::types::{ProgressState, Task, Week};

/// Definition of one week: a title and its ordered task labels
#[derive(Debug, Clone, Copy)]
pub struct WeekDef {
    pub title: &'static str,
    pub tasks: &'static [&'static str],
}

/// An immutable catalog of weeks
#[derive(Debug, Clone, Copy)]
pub struct Curriculum {
    pub weeks: &'static [WeekDef],
}

/// The built-in four-week plan
pub const DEFAULT: Curriculum = Curriculum {
    weeks: &[
        WeekDef {
            title: "Semana 1 — Fundamentos",
            tasks: &[
                "Tour pela interface & workspace",
                "Camadas: criar/organizar",
                "Seleções básicas",
                "Recorte com Quick Selection",
                "Treino de brush",
                "✨ Projeto: Cartão de boas-vindas mágico",
                "✨ Projeto: Criatura mágica minimalista (cozy cute)",
            ],
        },
        WeekDef {
            title: "Semana 2 — Ajustes & Máscaras",
            tasks: &[
                "Ajustes (Brightness/Hue/Curves)",
                "Adjustment Layers",
                "Praticar Layer Masks",
                "Degradê e modos de mesclagem",
                "Limpeza de imagem",
                "✨ Projeto: Cidade dentro da xícara (fotomanipulação mágica)",
                "✨ Projeto: Portal para outro mundo (janela ou porta mágica)",
            ],
        },
        WeekDef {
            title: "Semana 3 — Brushes & Composição",
            tasks: &[
                "Pincéis: Opacity/Flow",
                "Criar e salvar pincéis",
                "Iluminação manual (pincel)",
                "Aplicar texturas com máscara",
                "Estudo de paletas e recriar",
                "✨ Projeto: Criatura de luz (vagalume, borboleta mágica, espírito)",
                "✨ Projeto: Casa aconchegante dentro de um cogumelo",
            ],
        },
        WeekDef {
            title: "Semana 4 — Design & Portfólio",
            tasks: &[
                "Tipografia e hierarquia",
                "Template para redes sociais",
                "Mockups (inserir em objetos)",
                "Criar mini-poster",
                "Revisão geral",
                "✨ Projeto: Poster \"A Jornada da Pequena Estrela\"",
                "✨ Projeto: Wallpaper \"Dreamy Forest\"",
                "✨ Projeto: Mini-portfólio cozy cute (PDF ou imagem)",
            ],
        },
    ],
};

impl Default for Curriculum {
    fn default() -> Self {
        DEFAULT
    }
}

impl Curriculum {
    /// Build a fresh state with every task not done
    pub fn seed(&self) -> ProgressState {
        ProgressState {
            weeks: self
                .weeks
                .iter()
                .map(|w| Week {
                    title: w.title.to_string(),
                    tasks: w.tasks.iter().map(|t| Task::new(*t)).collect(),
                })
                .collect(),
        }
    }

    /// Check that a restored state has the same week and task counts.
    /// Titles are not compared.
    pub fn matches_shape(&self, state: &ProgressState) -> bool {
        state.weeks.len() == self.weeks.len()
            && state
                .weeks
                .iter()
                .zip(self.weeks)
                .all(|(week, def)| week.tasks.len() == def.tasks.len())
    }
}
