//! Nickname-aware name equivalence.
//!
//! A fixed bidirectional dictionary underlies full-name equivalence: last
//! names must match exactly, first names up to nickname equivalence. Used
//! for alias absorption during minting and cross-document merge.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Nickname pairs, stored in both directions.
static NICKNAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let pairs: &[(&str, &str)] = &[
        ("jim", "james"),
        ("jimmy", "james"),
        ("bill", "william"),
        ("billy", "william"),
        ("will", "william"),
        ("liam", "william"),
        ("bob", "robert"),
        ("bobby", "robert"),
        ("rob", "robert"),
        ("bert", "robert"),
        ("dick", "richard"),
        ("rick", "richard"),
        ("rich", "richard"),
        ("kate", "katherine"),
        ("katie", "katherine"),
        ("kathy", "katherine"),
        ("kitty", "katherine"),
        ("beth", "elizabeth"),
        ("liz", "elizabeth"),
        ("lizzy", "elizabeth"),
        ("eliza", "elizabeth"),
        ("betsy", "elizabeth"),
        ("peggy", "margaret"),
        ("meg", "margaret"),
        ("maggie", "margaret"),
        ("ted", "theodore"),
        ("teddy", "theodore"),
        ("theo", "theodore"),
        ("tom", "thomas"),
        ("tommy", "thomas"),
        ("tony", "anthony"),
        ("drew", "andrew"),
        ("andy", "andrew"),
        ("dan", "daniel"),
        ("danny", "daniel"),
        ("dave", "david"),
        ("davy", "david"),
        ("ed", "edward"),
        ("eddie", "edward"),
        ("ned", "edward"),
        ("frank", "francis"),
        ("fred", "frederick"),
        ("freddie", "frederick"),
        ("harry", "henry"),
        ("hal", "henry"),
        ("jack", "john"),
        ("johnny", "john"),
        ("joe", "joseph"),
        ("joey", "joseph"),
        ("larry", "lawrence"),
        ("mike", "michael"),
        ("mickey", "michael"),
        ("nick", "nicholas"),
        ("pat", "patrick"),
        ("pete", "peter"),
        ("ron", "ronald"),
        ("ronnie", "ronald"),
        ("sam", "samuel"),
        ("sammy", "samuel"),
        ("steve", "stephen"),
        ("stevie", "stephen"),
        ("abby", "abigail"),
        ("annie", "anne"),
        ("becky", "rebecca"),
        ("cathy", "catherine"),
        ("chris", "christopher"),
        ("cindy", "cynthia"),
        ("debbie", "deborah"),
        ("ellie", "eleanor"),
        ("nell", "eleanor"),
        ("jenny", "jennifer"),
        ("jen", "jennifer"),
        ("jessie", "jessica"),
        ("lucy", "lucille"),
        ("mandy", "amanda"),
        ("molly", "mary"),
        ("nancy", "anne"),
        ("sally", "sarah"),
        ("sue", "susan"),
        ("susie", "susan"),
        ("trish", "patricia"),
        ("tricia", "patricia"),
        ("vicky", "victoria"),
        ("ginny", "virginia"),
        ("alex", "alexander"),
        ("sasha", "alexander"),
        ("gus", "augustus"),
        ("greg", "gregory"),
        ("matt", "matthew"),
        ("nate", "nathaniel"),
        ("nathan", "nathaniel"),
        ("phil", "philip"),
        ("ray", "raymond"),
        ("walt", "walter"),
        ("wally", "walter"),
        ("zach", "zachary"),
    ];
    let mut map = HashMap::new();
    for &(nick, full) in pairs {
        map.insert(nick, full);
    }
    map
});

/// Whether two first names are the same up to nickname equivalence.
pub fn first_names_equivalent(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return true;
    }
    let expand = |name: &str| -> String {
        NICKNAMES
            .get(name)
            .map(|full| full.to_string())
            .unwrap_or_else(|| name.to_string())
    };
    expand(&a) == expand(&b)
}

/// Whether two full names denote the same person: last names match exactly,
/// first names are equal up to nickname equivalence.
pub fn are_full_names_equivalent(a: &str, b: &str) -> bool {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.len() < 2 || b_words.len() < 2 {
        return false;
    }
    let a_last = a_words.last().unwrap().to_lowercase();
    let b_last = b_words.last().unwrap().to_lowercase();
    if a_last != b_last {
        return false;
    }
    first_names_equivalent(a_words[0], b_words[0])
}
