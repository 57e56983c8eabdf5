use super::domain::StepId;

/// Static definition of one review step.
#[derive(Debug, Clone)]
pub struct StepTemplate {
    pub id: StepId,
    pub name: &'static str,
    pub description: &'static str,
    pub checks: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ReviewBlueprint {
    steps: [StepTemplate; StepId::COUNT],
}

impl ReviewBlueprint {
    pub fn standard() -> Self {
        Self {
            steps: standard_step_templates(),
        }
    }

    pub fn step(&self, id: StepId) -> &StepTemplate {
        &self.steps[id.index()]
    }

    pub fn step_templates(&self) -> &[StepTemplate] {
        &self.steps
    }
}

impl Default for ReviewBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_step_templates() -> [StepTemplate; StepId::COUNT] {
    [
        StepTemplate {
            id: StepId::DocumentVerification,
            name: "Document Verification",
            description: "Verify that the uploaded identity document, transcript, and photograph are legible and authentic.",
            checks: vec![
                "Identity document matches the name and date of birth on the profile.",
                "Academic transcript is issued by the school listed in the school history.",
                "Photograph meets the student card requirements.",
            ],
        },
        StepTemplate {
            id: StepId::EligibilityCheck,
            name: "Eligibility Check",
            description: "Confirm the applicant meets the admission requirements for the selected programme.",
            checks: vec![
                "Graduation year and grades satisfy the programme minimums.",
                "Emergency contact and family details are complete.",
            ],
        },
        StepTemplate {
            id: StepId::FinalReview,
            name: "Final Review",
            description: "Registrar sign-off before the student is admitted.",
            checks: vec!["Earlier steps are completed and no open notes remain."],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_blueprint_keeps_fixed_order() {
        let blueprint = ReviewBlueprint::standard();
        let ids: Vec<StepId> = blueprint.step_templates().iter().map(|t| t.id).collect();
        assert_eq!(ids, StepId::ordered().to_vec());
    }

    #[test]
    fn template_names_match_persisted_labels() {
        let blueprint = ReviewBlueprint::standard();
        for id in StepId::ordered() {
            assert_eq!(blueprint.step(id).name, id.label());
            assert!(!blueprint.step(id).checks.is_empty());
        }
    }
}
