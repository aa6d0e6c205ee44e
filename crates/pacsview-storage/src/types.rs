//! Result types returned by repositories.

use serde::{Deserialize, Serialize};

use pacsview_core::Study;

/// One page of study search results plus the total match count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyPage {
    /// The studies on this page, in compiled sort order.
    pub studies: Vec<Study>,
    /// Total matching studies across all pages.
    pub total: usize,
    /// Zero-indexed page number this page was fetched for.
    pub page: usize,
    pub page_size: usize,
}

impl StudyPage {
    pub fn new(studies: Vec<Study>, total: usize, page: usize, page_size: usize) -> Self {
        Self {
            studies,
            total,
            page,
            page_size,
        }
    }

    /// Whether results exist beyond this page.
    pub fn has_more(&self) -> bool {
        (self.page + 1) * self.page_size < self.total
    }

    pub fn len(&self) -> usize {
        self.studies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more() {
        let page = StudyPage::new(Vec::new(), 45, 0, 20);
        assert!(page.has_more());
        let last = StudyPage::new(Vec::new(), 45, 2, 20);
        assert!(!last.has_more());
    }
}
