//! End-to-end pipeline test: grouping, voting, debate, resolution and
//! deduplication with a scripted backend.

use std::sync::Arc;

use consensus::debate::{ConsensusType, MarkerResponseParser, ScriptedBackend};
use consensus::voting::group_reviewer_opinions;
use consensus::{
    classify_debate_need, decide_consensus, ConsensusDecision, DiscussionSeverity,
    DiscussionStatus, EngineConfig, Opinion, ResolutionBasis, ReviewPipeline, SequentialIds,
    Severity,
};

fn opinion(reviewer: &str, severity: Severity, file: &str, line: u32, title: &str) -> Opinion {
    Opinion::new(reviewer, severity, file, line, title)
}

fn pipeline(backend: ScriptedBackend) -> ReviewPipeline {
    ReviewPipeline::new(
        EngineConfig::default(),
        Arc::new(backend),
        Arc::new(MarkerResponseParser),
    )
    .unwrap()
}

// ── Voting properties ──────────────────────────────────────────────

#[test]
fn test_voting_properties() {
    let groups = group_reviewer_opinions(vec![
        // Unanimous pair.
        ("a".to_string(), opinion("", Severity::Major, "x.rs", 1, "Leak")),
        ("b".to_string(), opinion("", Severity::Major, "x.rs", 1, "Leak")),
        // 3 of 4.
        ("a".to_string(), opinion("", Severity::Minor, "y.rs", 2, "Naming")),
        ("b".to_string(), opinion("", Severity::Minor, "y.rs", 2, "Naming")),
        ("c".to_string(), opinion("", Severity::Minor, "y.rs", 2, "Naming")),
        ("d".to_string(), opinion("", Severity::Major, "y.rs", 2, "Naming")),
        // 2/2 split.
        ("a".to_string(), opinion("", Severity::Major, "z.rs", 3, "Panic")),
        ("b".to_string(), opinion("", Severity::Minor, "z.rs", 3, "Panic")),
    ]);
    assert_eq!(groups.len(), 3);

    match decide_consensus(&groups[0], 0.75) {
        ConsensusDecision::Consensus { confidence, .. } => assert_eq!(confidence, 1.0),
        other => panic!("expected consensus, got {:?}", other),
    }
    match decide_consensus(&groups[1], 0.75) {
        ConsensusDecision::Consensus {
            severity,
            confidence,
            ..
        } => {
            assert_eq!(severity, Severity::Minor);
            assert_eq!(confidence, 0.75);
        }
        other => panic!("expected consensus, got {:?}", other),
    }
    match decide_consensus(&groups[2], 0.75) {
        ConsensusDecision::NeedsDebate { reason, .. } => {
            assert!(reason.contains("Conflicting severity"))
        }
        other => panic!("expected debate, got {:?}", other),
    }

    let trigger = classify_debate_need(&groups[2..]);
    assert!(trigger.required);
    assert_eq!(trigger.triggering_opinions.len(), 2);
}

#[test]
fn test_single_opinion_groups_never_debate() {
    for severity in Severity::ALL {
        let groups = group_reviewer_opinions(vec![(
            "solo".to_string(),
            opinion("", severity, "a.rs", 1, "Only one"),
        )]);
        let decision = decide_consensus(&groups[0], 0.75);
        assert!(decision.is_consensus(), "{} should be accepted", severity);
        assert!(!classify_debate_need(&groups).required);
    }
}

// ── Full run ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_pipeline_debates_and_merges() {
    let backend = ScriptedBackend::new()
        .with_script(
            "alice",
            ["SEVERITY: critical\nCONFIDENCE: 95\nThe query on line 12 concatenates `user_id`, \
              because the ORM is bypassed."],
        )
        .with_script(
            "bob",
            ["SEVERITY: critical\nAgreed: the value reaches the query unescaped."],
        );

    let opinions = vec![
        // Contested: debated to critical.
        opinion("alice", Severity::Critical, "auth.ts", 10, "SQL Injection").with_line_end(15),
        opinion("bob", Severity::Minor, "auth.ts", 10, "SQL Injection").with_line_end(15),
        // Near-duplicate of the above, agreed by vote.
        opinion("carol", Severity::Major, "auth.ts", 12, "SQL Injection Risk").with_line_end(18),
        opinion("dave", Severity::Major, "auth.ts", 12, "SQL Injection Risk").with_line_end(18),
        // Unrelated single opinion.
        opinion("erin", Severity::Nitpick, "README.md", 3, "Typo"),
    ];

    let mut ids = SequentialIds::new("review");
    let report = pipeline(backend).run(opinions, &mut ids).await.unwrap();

    assert_eq!(report.decisions.len(), 3);
    assert_eq!(report.debates.len(), 1);
    let debate = &report.debates[0];
    assert_eq!(debate.consensus_type, ConsensusType::Strong);
    assert_eq!(debate.final_severity, Severity::Critical);

    assert_eq!(report.merged_count, 1);
    assert_eq!(report.discussions.len(), 2);

    let sql = &report.discussions[0];
    assert_eq!(sql.id, "review-001");
    assert_eq!(sql.line_range(), (10, 18));
    assert_eq!(sql.severity, DiscussionSeverity::HarshlyCritical);
    assert_eq!(sql.evidence.len(), 4);
    assert_eq!(sql.status, DiscussionStatus::Resolved);
    assert_eq!(sql.merged_from, vec!["review-002".to_string()]);
    assert!(sql.title.ends_with("(merged with 1 duplicate(s))"));
    assert!(matches!(sql.basis, Some(ResolutionBasis::Debate { rounds: 1, .. })));

    let typo = &report.discussions[1];
    assert_eq!(typo.severity, DiscussionSeverity::Suggestion);
    assert_eq!(typo.file, "README.md");
}

#[tokio::test]
async fn test_failed_debate_is_disputed() {
    let backend = ScriptedBackend::new()
        .with_script("alice", ["SEVERITY: critical\nStill critical."])
        .with_script("bob", ["SEVERITY: minor\nStill minor."]);

    let report = pipeline(backend)
        .run(
            vec![
                opinion("alice", Severity::Critical, "lib.rs", 7, "Unsafe transmute"),
                opinion("bob", Severity::Minor, "lib.rs", 7, "Unsafe transmute"),
            ],
            &mut SequentialIds::default(),
        )
        .await
        .unwrap();

    let debate = &report.debates[0];
    assert!(debate.rounds_run <= 3);
    assert_eq!(debate.consensus_type, ConsensusType::Failed);

    let discussion = &report.discussions[0];
    assert_eq!(discussion.status, DiscussionStatus::Disputed);
    assert_eq!(discussion.severity, DiscussionSeverity::Critical);
}
