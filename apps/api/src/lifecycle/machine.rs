use crate::models::application::ApplicationStatus;

/// Legal forward edges of the application lifecycle.
///
/// `pending → resume_assessed | assessment_failed`, then
/// `resume_assessed → scheduled → interview_completed → final_assessed`.
/// `assessment_failed` and `final_assessed` are terminal.
pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    matches!(
        (from, to),
        (Pending, ResumeAssessed)
            | (Pending, AssessmentFailed)
            | (ResumeAssessed, Scheduled)
            | (Scheduled, InterviewCompleted)
            | (InterviewCompleted, FinalAssessed)
    )
}

pub fn is_terminal(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::AssessmentFailed | ApplicationStatus::FinalAssessed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    const ALL: [ApplicationStatus; 6] = [
        Pending,
        ResumeAssessed,
        AssessmentFailed,
        Scheduled,
        InterviewCompleted,
        FinalAssessed,
    ];

    #[test]
    fn test_forward_edges_allowed() {
        assert!(can_transition(Pending, ResumeAssessed));
        assert!(can_transition(Pending, AssessmentFailed));
        assert!(can_transition(ResumeAssessed, Scheduled));
        assert!(can_transition(Scheduled, InterviewCompleted));
        assert!(can_transition(InterviewCompleted, FinalAssessed));
    }

    #[test]
    fn test_no_backward_or_skipping_edges() {
        assert!(!can_transition(ResumeAssessed, Pending));
        assert!(!can_transition(Pending, Scheduled));
        assert!(!can_transition(ResumeAssessed, FinalAssessed));
        assert!(!can_transition(AssessmentFailed, ResumeAssessed));
        for status in ALL {
            assert!(!can_transition(status, status), "self-loop on {status}");
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.into_iter().filter(|s| is_terminal(*s)) {
            for to in ALL {
                assert!(!can_transition(from, to), "{from} -> {to}");
            }
        }
        assert!(!is_terminal(Pending));
    }
}
