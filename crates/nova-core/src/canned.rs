//! Pre-written answers for the most frequent HR topics.
//!
//! The table is an ordered list of `(keyword, answer)` pairs. Lookup scans
//! the list front to back and the first keyword that occurs in the question
//! wins, so when a question mentions two topics the earlier entry answers it.

/// An immutable, ordered keyword → answer table.
#[derive(Debug, Clone)]
pub struct CannedAnswerTable {
    entries: Vec<CannedAnswer>,
}

/// One row of a [`CannedAnswerTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedAnswer {
    /// Lower-case topic keyword, matched as a substring.
    pub keyword: String,
    /// Answer returned verbatim on a match.
    pub answer: String,
}

impl CannedAnswerTable {
    /// Build a table from `(keyword, answer)` pairs, preserving their order.
    ///
    /// Keywords are lower-cased so matching is case-insensitive regardless of
    /// how the caller spelled them. Empty keywords are dropped since they
    /// would match every question.
    pub fn new<K, A>(entries: impl IntoIterator<Item = (K, A)>) -> Self
    where
        K: Into<String>,
        A: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, a)| CannedAnswer {
                keyword: k.into().to_lowercase(),
                answer: a.into(),
            })
            .filter(|e| !e.keyword.is_empty())
            .collect();
        Self { entries }
    }

    /// A table with no entries; every question goes to the generator.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Return the first entry whose keyword occurs in `question`.
    pub fn lookup(&self, question: &str) -> Option<&CannedAnswer> {
        let question = question.to_lowercase();
        self.entries
            .iter()
            .find(|e| question.contains(e.keyword.as_str()))
    }

    pub fn entries(&self) -> &[CannedAnswer] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CannedAnswerTable {
    /// The stock HR topics, in priority order.
    fn default() -> Self {
        Self::new([
            ("company policies", COMPANY_POLICIES),
            ("time off", TIME_OFF),
            ("benefits", BENEFITS),
            ("update information", UPDATE_INFORMATION),
        ])
    }
}

pub const COMPANY_POLICIES: &str = "Our company policies include:
1. Code of Conduct: Professional behavior and ethical standards
2. Remote Work: Flexible work arrangements with manager approval
3. Dress Code: Business casual, with specific guidelines for client meetings
4. Attendance: Standard 9-5 with flexible hours option
5. Workplace Safety: Regular training and emergency procedures
For detailed information, please refer to the employee handbook or contact HR.";

pub const TIME_OFF: &str = "To request time off:
1. Submit request through the HR portal at least 2 weeks in advance
2. Include dates and reason for leave
3. Await manager approval
4. Receive confirmation email
For urgent requests, contact your manager directly.";

pub const BENEFITS: &str = "Employee benefits include:
1. Health Insurance: Medical, dental, and vision coverage
2. 401(k): Company matching up to 5%
3. PTO: 15 days annually, increasing with tenure
4. Parental Leave: 12 weeks paid leave
5. Wellness Program: Gym membership and mental health support
For enrollment or questions, contact benefits@company.com";

pub const UPDATE_INFORMATION: &str = "To update your information:
1. Log into the HR portal
2. Navigate to 'My Profile'
3. Select the information to update
4. Submit changes for verification
For urgent updates, contact HR directly.";
