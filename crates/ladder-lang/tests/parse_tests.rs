// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Program surface grammar coverage.
use ladder_core::Action;
use ladder_lang::{parse_program, ParseError};

const COHERENT: &str = r"
; expand A one scale up, then fold it back down
(root A)
(rules
  (rule up (pattern :sym A) (action expand :fanout 1))
  (rule down (pattern :sym F(A)) (action reduce)))
(max_steps 2)
";

#[test]
fn parses_a_complete_program() {
    let program = parse_program("coherent", COHERENT).unwrap();
    assert_eq!(program.name, "coherent");
    assert_eq!(program.root.symbol, "A");
    assert_eq!(program.root.scale, 0);
    assert_eq!(program.max_steps, 2);
    assert_eq!(program.rules.len(), 2);
    assert_eq!(program.rules[0].name, "up");
    assert_eq!(program.rules[0].action, Action::Expand { fanout: 1 });
    assert_eq!(program.rules[1].pattern.symbol.as_deref(), Some("F(A)"));
    assert_eq!(program.rules[1].action, Action::Reduce);
}

#[test]
fn bare_symbols_inherit_scale_zero_and_lists_carry_scale_and_children() {
    let program = parse_program(
        "t",
        "(root (world :scale 2 (region :scale 1 cell) other))\n(max_steps 1)",
    )
    .unwrap();
    let root = &program.root;
    assert_eq!((root.symbol.as_str(), root.scale), ("world", 2));
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].scale, 1);
    assert_eq!(root.children[0].children[0].symbol, "cell");
    // `other` has no :scale marker, so it sits at the default.
    assert_eq!(root.children[1].scale, 0);
}

#[test]
fn pattern_scale_accepts_membership_lists() {
    let program = parse_program(
        "t",
        "(root A)\n(rules (rule r (pattern :scale (0 2 5)) (action reduce)))\n(max_steps 1)",
    )
    .unwrap();
    let scales = program.rules[0].pattern.scales.clone().unwrap();
    assert_eq!(scales.into_iter().collect::<Vec<u32>>(), [0, 2, 5]);
}

#[test]
fn custom_actions_capture_their_parameter_map() {
    let program = parse_program(
        "t",
        "(root A)\n(rules (rule r (pattern :sym A) (action fuse :mode fast :limit 3)))\n(max_steps 1)",
    )
    .unwrap();
    let Action::Custom { name, params } = &program.rules[0].action else {
        panic!("expected custom action");
    };
    assert_eq!(name, "fuse");
    assert_eq!(params["mode"], "fast");
    assert_eq!(params["limit"], "3");
}

#[test]
fn comments_are_ignored_anywhere() {
    let program = parse_program(
        "t",
        "; leading\n(root A) ; trailing\n(max_steps 1) ;; double",
    )
    .unwrap();
    assert_eq!(program.root.symbol, "A");
}

#[test]
fn missing_root_is_rejected() {
    assert_eq!(
        parse_program("t", "(max_steps 1)"),
        Err(ParseError::MissingRoot)
    );
}

#[test]
fn missing_max_steps_is_rejected() {
    assert_eq!(
        parse_program("t", "(root A)"),
        Err(ParseError::MissingMaxSteps)
    );
}

#[test]
fn negative_scales_are_rejected_as_bad_integers() {
    let err = parse_program("t", "(root (A :scale -1))\n(max_steps 1)").unwrap_err();
    assert!(matches!(err, ParseError::BadInteger(_, text) if text == "-1"));
}

#[test]
fn unbalanced_parens_are_rejected_with_position() {
    assert!(matches!(
        parse_program("t", "(root A"),
        Err(ParseError::UnexpectedEof)
    ));
    assert!(matches!(
        parse_program("t", "(root A))\n(max_steps 1)"),
        Err(ParseError::UnbalancedClose(_))
    ));
}

#[test]
fn unknown_top_level_forms_are_rejected() {
    let err = parse_program("t", "(root A)\n(genome X)\n(max_steps 1)").unwrap_err();
    assert!(matches!(err, ParseError::UnknownForm { head, .. } if head == "genome"));
}

#[test]
fn expand_requires_a_fanout() {
    let err = parse_program(
        "t",
        "(root A)\n(rules (rule r (pattern :sym A) (action expand)))\n(max_steps 1)",
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
}

#[test]
fn duplicate_top_level_forms_are_rejected() {
    let err = parse_program("t", "(root A)\n(root B)\n(max_steps 1)").unwrap_err();
    assert!(matches!(err, ParseError::DuplicateForm(_, "root")));
}
