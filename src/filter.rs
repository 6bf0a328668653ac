use crate::model::{CheckRun, Conclusion};

/// Failed runs, in their original order.
pub fn filter_failed(check_runs: &[CheckRun]) -> Vec<CheckRun> {
    check_runs
        .iter()
        .filter(|run| run.conclusion == Conclusion::Failure)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, conclusion: Conclusion) -> CheckRun {
        CheckRun {
            name: name.into(),
            conclusion,
            app_name: "CI".into(),
            app_icon_url: String::new(),
            details_url: String::new(),
            head_sha: "abc123".into(),
            head_branch: "main".into(),
        }
    }

    #[test]
    fn keeps_only_failures_in_order() {
        let runs = vec![
            run("lint", Conclusion::Failure),
            run("build", Conclusion::Success),
            run("docs", Conclusion::Cancelled),
            run("test", Conclusion::Failure),
            run("deploy", Conclusion::TimedOut),
            run("pending", Conclusion::Unknown),
        ];
        let names: Vec<_> = filter_failed(&runs).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["lint", "test"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(filter_failed(&[]).is_empty());
    }

    #[test]
    fn all_passing_gives_empty_output() {
        let runs = vec![run("a", Conclusion::Success), run("b", Conclusion::Neutral)];
        assert!(filter_failed(&runs).is_empty());
    }
}
