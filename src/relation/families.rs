//! The pattern-family catalog.
//!
//! The catalog is data, not code: each family declares a cue regex (with
//! named `subj`/`obj` capture groups), a predicate, symmetry, argument type
//! guards, and flags for list extraction and deictic objects. Coordination
//! ("X and Y") is part of the subject grammar itself, and passive-voice
//! variants carry their capture groups pre-swapped in the cue, so neither
//! needs a flag. The engine in [`super::pattern`] is a single matcher over
//! this table.

use std::sync::LazyLock;

use regex::Regex;

use crate::entity::EntityType;

/// Proper-name subpattern: capitalized words, optionally several.
pub const NAME: &str = r"[A-Z][\w'\u{2019}.-]*(?:\s+[A-Z][\w'\u{2019}.-]*)*";

/// Subject/object subpattern: a name, a coordination of names, a collective
/// phrase, or a resolvable pronoun.
pub const NP: &str = r"(?:[Tt]he\s+(?:couple|pair|two|group|family)|[A-Z][\w'\u{2019}.-]*(?:\s+[A-Z][\w'\u{2019}.-]*)*(?:\s+and\s+[A-Z][\w'\u{2019}.-]*(?:\s+[A-Z][\w'\u{2019}.-]*)*)*|[Hh]e|[Ss]he|[Tt]hey|[Ii]t|[Tt]he\s+[a-z]+)";

/// Optional narrative adverb between subject and cue verb.
pub const ADV: &str = r"(?:(?:then|soon|later|finally|eventually|[a-z]+ly)\s+)?";

const PERSON: &[EntityType] = &[EntityType::Person];
const PERSON_PAIR: (&[EntityType], &[EntityType]) = (PERSON, PERSON);
const ORGISH: &[EntityType] = &[EntityType::Org, EntityType::House];
const PLACEISH: &[EntityType] = &[EntityType::Place, EntityType::Gpe];
const ANY: &[EntityType] = &[];

/// One declarative pattern family.
pub struct FamilySpec {
    pub name: &'static str,
    /// Cue with `{S}`/`{O}`/`{ADV}`/`{N}` placeholders for the subject and
    /// object grammars, the optional adverb, and a bare name.
    pub cue: &'static str,
    pub predicate: &'static str,
    pub symmetric: bool,
    pub subj_types: &'static [EntityType],
    pub obj_types: &'static [EntityType],
    /// Object continues as a colon-separated list of names.
    pub list_extraction: bool,
    /// Object slot may be deictic ("there", "here").
    pub deictic_obj: bool,
    pub confidence: f32,
}

impl FamilySpec {
    const fn new(
        name: &'static str,
        cue: &'static str,
        predicate: &'static str,
        confidence: f32,
    ) -> Self {
        Self {
            name,
            cue,
            predicate,
            symmetric: false,
            subj_types: ANY,
            obj_types: ANY,
            list_extraction: false,
            deictic_obj: false,
            confidence,
        }
    }

    const fn symmetric(mut self) -> Self {
        self.symmetric = true;
        self
    }

    const fn types(mut self, subj: &'static [EntityType], obj: &'static [EntityType]) -> Self {
        self.subj_types = subj;
        self.obj_types = obj;
        self
    }

    const fn list(mut self) -> Self {
        self.list_extraction = true;
        self
    }

    const fn deictic(mut self) -> Self {
        self.deictic_obj = true;
        self
    }
}

/// The ordered catalog. Earlier families win dedup ties through higher
/// confidence, not position; order only groups related cues.
pub static CATALOG: LazyLock<Vec<CompiledFamily>> = LazyLock::new(|| {
    let specs: Vec<FamilySpec> = vec![
        // -- Marriage -------------------------------------------------------
        FamilySpec::new(
            "marriage_verb",
            r"{S}\s+{ADV}(?:married|wed)\s+{O}",
            "married_to",
            0.90,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "marriage_coordinated",
            r"{S}\s+(?:were\s+married|married|wed)(?:\s+in|\s+at|\s+on|[.,])",
            "married_to",
            0.88,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "marriage_state",
            r"{S}\s+(?:was|is)\s+married\s+to\s+{O}",
            "married_to",
            0.90,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        // -- Friendship / enmity -------------------------------------------
        FamilySpec::new(
            "friendship",
            r"{S}\s+(?:befriended|became\s+friends\s+with|was\s+friends\s+with|were\s+friends\s+with)\s+{O}",
            "friends_with",
            0.85,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "enmity",
            r"{S}\s+(?:hated|despised|loathed)\s+{O}",
            "enemy_of",
            0.80,
        )
        .symmetric(),
        FamilySpec::new(
            "rivalry",
            r"{S}\s+(?:rivaled|competed\s+with|was\s+the\s+rival\s+of)\s+{O}",
            "rival_of",
            0.80,
        )
        .symmetric(),
        FamilySpec::new(
            "alliance",
            r"{S}\s+(?:allied\s+with|made\s+an\s+alliance\s+with|sided\s+with)\s+{O}",
            "allied_with",
            0.85,
        )
        .symmetric(),
        // -- Family ---------------------------------------------------------
        FamilySpec::new(
            "parenthood",
            r"{S}\s+(?:was|is)\s+the\s+(?:father|mother)\s+of\s+{O}",
            "parent_of",
            0.90,
        )
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "childhood",
            r"{S},?\s+(?:the\s+)?(?:son|daughter)\s+of\s+{O}",
            "child_of",
            0.85,
        )
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "parent_raised",
            r"{O}\s+was\s+raised\s+by\s+{S}",
            "parent_of",
            0.80,
        )
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "siblinghood",
            r"{S}\s+(?:were|are)\s+(?:brothers|sisters|siblings)",
            "sibling_of",
            0.88,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        FamilySpec::new(
            "sibling_state",
            r"{S}\s+(?:was|is)\s+(?:the\s+)?(?:brother|sister)\s+of\s+{O}",
            "sibling_of",
            0.88,
        )
        .symmetric()
        .types(PERSON_PAIR.0, PERSON_PAIR.1),
        // -- Education / teaching / employment ------------------------------
        FamilySpec::new(
            "education",
            r"{S}\s+(?:studied|was\s+educated|enrolled)\s+at\s+{O}",
            "studies_at",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "attendance",
            r"{S}\s+attend(?:ed|s)\s+{O}",
            "studies_at",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "sorting",
            r"{S}\s+(?:was|were)\s+sorted\s+into\s+{O}",
            "member_of",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "teaching",
            r"{S}\s+(?:taught|lectured)\s+at\s+{O}",
            "teaches_at",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "employment",
            r"{S}\s+work(?:ed|s)\s+(?:at|for)\s+{O}",
            "works_at",
            0.85,
        )
        .types(PERSON, ORGISH),
        // -- Membership / leadership ----------------------------------------
        FamilySpec::new(
            "membership",
            r"{S}\s+(?:joined|belonged\s+to|was\s+a\s+member\s+of|were\s+members\s+of)\s+{O}",
            "member_of",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "leadership_verb",
            r"{S}\s+(?:led|leads|commanded|headed)\s+{O}",
            "leads",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "leadership_state",
            r"{S}\s+(?:was|is)\s+(?:also\s+)?the\s+(?:head|leader|captain|chief|director)\s+of\s+{O}",
            "leads",
            0.85,
        )
        .types(PERSON, ORGISH),
        FamilySpec::new(
            "leadership_passive",
            r"{O}\s+(?:was|is)\s+led\s+by\s+{S}",
            "leads",
            0.85,
        )
        .types(PERSON, ORGISH),
        // -- Residence / travel ---------------------------------------------
        FamilySpec::new(
            "residence",
            r"{S}\s+{ADV}liv(?:ed|es)\s+(?:in|at)\s+{O}",
            "lives_in",
            0.85,
        )
        .types(PERSON, PLACEISH)
        .deictic(),
        FamilySpec::new(
            "settlement",
            r"{S}\s+{ADV}(?:settled|remained|stayed)\s+in\s+{O}",
            "lives_in",
            0.80,
        )
        .types(PERSON, PLACEISH)
        .deictic(),
        FamilySpec::new(
            "relocation",
            r"{S}\s+{ADV}moved\s+to\s+{O}",
            "moved_to",
            0.85,
        )
        .types(PERSON, PLACEISH),
        FamilySpec::new(
            "travel",
            r"{S}\s+{ADV}(?:traveled|travelled|journeyed|rode|sailed|went)\s+to\s+{O}",
            "traveled_to",
            0.80,
        )
        .types(PERSON, PLACEISH),
        FamilySpec::new(
            "arrival",
            r"{S}\s+{ADV}(?:arrived|returned)\s+(?:in|at|to)\s+{O}",
            "traveled_to",
            0.80,
        )
        .types(PERSON, PLACEISH),
        FamilySpec::new(
            "departure",
            r"{S}\s+{ADV}(?:left|departed|fled)[.,!?]",
            "departed",
            0.75,
        )
        .types(PERSON, ANY),
        // -- Battle / violence ----------------------------------------------
        FamilySpec::new(
            "battle",
            r"{S}\s+(?:fought|battled|dueled)\s+(?:against\s+)?{O}",
            "fought_against",
            0.85,
        )
        .symmetric(),
        FamilySpec::new("attack", r"{S}\s+{ADV}attack(?:ed|s)\s+{O}", "attacked", 0.85),
        FamilySpec::new(
            "attack_passive",
            r"{O}\s+was\s+attacked\s+by\s+{S}",
            "attacked",
            0.85,
        ),
        FamilySpec::new(
            "killing",
            r"{S}\s+{ADV}(?:killed|slew|murdered|assassinated)\s+{O}",
            "killed",
            0.90,
        ),
        FamilySpec::new(
            "killing_passive",
            r"{O}\s+was\s+(?:killed|slain|murdered|assassinated)\s+by\s+{S}",
            "killed",
            0.90,
        ),
        FamilySpec::new("betrayal", r"{S}\s+{ADV}betrayed\s+{O}", "betrayed", 0.85),
        FamilySpec::new(
            "betrayal_passive",
            r"{O}\s+was\s+betrayed\s+by\s+{S}",
            "betrayed",
            0.85,
        ),
        // -- Governance / part-whole / creation -----------------------------
        FamilySpec::new(
            "governance",
            r"{S}\s+(?:ruled|governed|reigned\s+over)\s+{O}",
            "rules",
            0.85,
        )
        .types(PERSON, ANY),
        FamilySpec::new(
            "part_whole",
            r"{S}\s+(?:was|is)\s+part\s+of\s+{O}",
            "part_of",
            0.80,
        ),
        FamilySpec::new(
            "creation",
            r"{S}\s+(?:built|created|founded|forged|wrote|composed)\s+{O}",
            "created",
            0.85,
        ),
        FamilySpec::new(
            "creation_passive",
            r"{O}\s+was\s+(?:built|created|founded|forged|written|composed)\s+by\s+{S}",
            "created",
            0.85,
        ),
        // -- Communication / transfer ---------------------------------------
        FamilySpec::new("telling", r"{S}\s+{ADV}told\s+{O}", "told", 0.80),
        FamilySpec::new(
            "conversation",
            r"{S}\s+(?:spoke|talked|conversed)\s+(?:with|to)\s+{O}",
            "spoke_with",
            0.75,
        )
        .symmetric(),
        FamilySpec::new(
            "promise",
            r"{S}\s+promised\s+{O}",
            "promised",
            0.80,
        ),
        FamilySpec::new(
            "transfer",
            r"{S}\s+(?:gave|handed|granted)\s+(?:\w+\s+){0,3}?to\s+{O}",
            "gave_to",
            0.80,
        ),
        // -- Perception / emotion / loyalty ---------------------------------
        FamilySpec::new(
            "meeting",
            r"{S}\s+{ADV}met\s+(?:with\s+)?{O}",
            "met",
            0.80,
        )
        .symmetric(),
        FamilySpec::new(
            "perception",
            r"{S}\s+{ADV}(?:saw|noticed|watched|spotted)\s+{O}",
            "saw",
            0.75,
        ),
        FamilySpec::new(
            "affection",
            r"{S}\s+(?:loved|adored|cherished)\s+{O}",
            "loves",
            0.85,
        ),
        FamilySpec::new(
            "fear",
            r"{S}\s+(?:feared|dreaded)\s+{O}",
            "fears",
            0.80,
        ),
        FamilySpec::new(
            "service",
            r"{S}\s+(?:served|was\s+loyal\s+to|swore\s+loyalty\s+to)\s+{O}",
            "serves",
            0.85,
        ),
        // -- Transformation / knowledge -------------------------------------
        FamilySpec::new(
            "transformation",
            r"{S}\s+(?:became|turned\s+into|transformed\s+into)\s+{O}",
            "became",
            0.80,
        ),
        FamilySpec::new(
            "learning",
            r"{S}\s+(?:learned\s+of|learned\s+about|discovered|heard\s+of)\s+{O}",
            "learned_of",
            0.80,
        ),
        FamilySpec::new(
            "knowledge",
            r"{S}\s+knew\s+(?:about\s+)?{O}",
            "knows",
            0.75,
        ),
        // -- Possession lists -----------------------------------------------
        FamilySpec::new(
            "possession_list",
            r"{S}\s+(?:had|owned|kept)\s+(?:\w+\s+)?(?:houses|homes|castles|ships|estates|horses):",
            "owns",
            0.80,
        )
        .list(),
    ];

    specs
        .into_iter()
        .map(|spec| {
            let has_obj = spec.cue.contains("{O}");
            let pattern = spec
                .cue
                .replace("{S}", &format!("(?P<subj>{NP})"))
                .replace("{O}", &format!("(?P<obj>{NP}|there|here)"))
                .replace("{ADV}", ADV)
                .replace("{N}", NAME);
            let regex = Regex::new(&pattern)
                .unwrap_or_else(|e| panic!("family {} has a bad cue: {e}", spec.name));
            CompiledFamily {
                spec,
                regex,
                has_obj,
            }
        })
        .collect()
});

/// A family with its compiled cue.
pub struct CompiledFamily {
    pub spec: FamilySpec,
    pub regex: Regex,
    /// Whether the cue declares an object capture at all.
    pub has_obj: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_compiles() {
        assert!(CATALOG.len() > 40, "expected a broad catalog");
    }

    #[test]
    fn marriage_cue_matches() {
        let family = CATALOG
            .iter()
            .find(|f| f.spec.name == "marriage_coordinated")
            .unwrap();
        let captures = family.regex.captures("Aria and Elias married.").unwrap();
        assert_eq!(&captures["subj"], "Aria and Elias");
    }

    #[test]
    fn sorting_cue_captures_coordination() {
        let family = CATALOG.iter().find(|f| f.spec.name == "sorting").unwrap();
        let captures = family
            .regex
            .captures("Harry and Ron were sorted into Gryffindor.")
            .unwrap();
        assert_eq!(&captures["subj"], "Harry and Ron");
        assert_eq!(&captures["obj"], "Gryffindor");
    }

    #[test]
    fn passive_killing_swaps_roles() {
        let family = CATALOG
            .iter()
            .find(|f| f.spec.name == "killing_passive")
            .unwrap();
        let captures = family
            .regex
            .captures("Boromir was slain by Lurtz.")
            .unwrap();
        assert_eq!(&captures["subj"], "Lurtz");
        assert_eq!(&captures["obj"], "Boromir");
    }

    #[test]
    fn leadership_state_matches_head_of() {
        let family = CATALOG
            .iter()
            .find(|f| f.spec.name == "leadership_state")
            .unwrap();
        let captures = family
            .regex
            .captures("Severus Snape was the head of Slytherin.")
            .unwrap();
        assert_eq!(&captures["subj"], "Severus Snape");
        assert_eq!(&captures["obj"], "Slytherin");
    }

    #[test]
    fn residence_accepts_collective_subject() {
        let family = CATALOG.iter().find(|f| f.spec.name == "residence").unwrap();
        let captures = family
            .regex
            .captures("The couple lived in Meridian Ridge.")
            .unwrap();
        assert_eq!(&captures["subj"], "The couple");
    }
}
