//! Exam list view with tab-based status filtering
//!
//! The list is refreshed from the backend after every successful assignment
//! or escalation, through [`ExamListRefresher`].

use crate::error::FetchError;
use crate::models::{Exam, ExamId, ExamStatus};
use crate::services::ProctorBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Status tab of the exam list screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExamTab {
    #[default]
    All,
    AwaitingProctors,
    CrossDepartment,
    Ready,
    Completed,
}

impl ExamTab {
    pub const ALL: [ExamTab; 5] = [
        ExamTab::All,
        ExamTab::AwaitingProctors,
        ExamTab::CrossDepartment,
        ExamTab::Ready,
        ExamTab::Completed,
    ];

    pub fn matches(&self, exam: &Exam) -> bool {
        match self {
            ExamTab::All => true,
            ExamTab::AwaitingProctors => exam.status == ExamStatus::AwaitingProctors,
            ExamTab::CrossDepartment => exam.status.is_cross_department(),
            ExamTab::Ready => exam.status == ExamStatus::Ready,
            ExamTab::Completed => exam.status.is_terminal(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExamTab::All => "All",
            ExamTab::AwaitingProctors => "Awaiting proctors",
            ExamTab::CrossDepartment => "Cross-department",
            ExamTab::Ready => "Ready",
            ExamTab::Completed => "Completed",
        }
    }
}

/// Hook run after a successful submission or escalation
#[async_trait]
pub trait ExamListRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), FetchError>;
}

/// Cached exams plus the active tab
#[derive(Debug, Clone, Default)]
pub struct ExamList {
    exams: Vec<Exam>,
    active_tab: ExamTab,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ExamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached exams, ordered by date then start time
    pub fn replace(&mut self, mut exams: Vec<Exam>) {
        exams.sort_by(|a, b| (a.date, a.start_time, a.id).cmp(&(b.date, b.start_time, b.id)));
        self.exams = exams;
        self.refreshed_at = Some(Utc::now());
    }

    pub fn set_tab(&mut self, tab: ExamTab) {
        self.active_tab = tab;
    }

    pub fn active_tab(&self) -> ExamTab {
        self.active_tab
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn get(&self, id: ExamId) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }

    /// Exams shown under the active tab
    pub fn visible(&self) -> Vec<&Exam> {
        self.exams
            .iter()
            .filter(|e| self.active_tab.matches(e))
            .collect()
    }

    /// Number of exams under each tab
    pub fn tab_counts(&self) -> Vec<(ExamTab, usize)> {
        ExamTab::ALL
            .iter()
            .map(|tab| (*tab, self.exams.iter().filter(|e| tab.matches(e)).count()))
            .collect()
    }
}

/// Exam list shared between the list screen and the assignment workflow
pub struct SharedExamList {
    backend: Arc<dyn ProctorBackend>,
    list: RwLock<ExamList>,
}

impl SharedExamList {
    pub fn new(backend: Arc<dyn ProctorBackend>) -> Self {
        Self {
            backend,
            list: RwLock::new(ExamList::new()),
        }
    }

    pub async fn snapshot(&self) -> ExamList {
        self.list.read().await.clone()
    }

    pub async fn set_tab(&self, tab: ExamTab) {
        self.list.write().await.set_tab(tab);
    }

    /// Exams under the active tab (cloned)
    pub async fn visible(&self) -> Vec<Exam> {
        self.list.read().await.visible().into_iter().cloned().collect()
    }
}

#[async_trait]
impl ExamListRefresher for SharedExamList {
    async fn refresh(&self) -> Result<(), FetchError> {
        let exams = self.backend.list_exams(None).await.map_err(FetchError::from)?;
        tracing::debug!(exams = exams.len(), "Exam list refreshed");
        self.list.write().await.replace(exams);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseRef;
    use chrono::{NaiveDate, NaiveTime};

    fn exam(id: ExamId, day: u32, status: ExamStatus) -> Exam {
        Exam {
            id,
            course: CourseRef {
                id: 1,
                code: "CS 101".to_string(),
                name: None,
            },
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: None,
            required_proctors: 2,
            assigned_proctors: 0,
            status,
        }
    }

    fn sample() -> ExamList {
        let mut list = ExamList::new();
        list.replace(vec![
            exam(3, 20, ExamStatus::Ready),
            exam(1, 10, ExamStatus::AwaitingProctors),
            exam(2, 15, ExamStatus::AwaitingCrossDepartmentApproval),
            exam(4, 5, ExamStatus::Completed),
            exam(5, 25, ExamStatus::AwaitingCrossDepartmentProctors),
            exam(6, 26, ExamStatus::Cancelled),
        ]);
        list
    }

    #[test]
    fn test_replace_orders_by_schedule() {
        let list = sample();
        let ids: Vec<ExamId> = list.visible().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 1, 2, 3, 5, 6]);
        assert!(list.refreshed_at().is_some());
    }

    #[test]
    fn test_tab_filtering() {
        let mut list = sample();

        list.set_tab(ExamTab::CrossDepartment);
        let ids: Vec<ExamId> = list.visible().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 5]);

        list.set_tab(ExamTab::Completed);
        let ids: Vec<ExamId> = list.visible().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 6]);

        list.set_tab(ExamTab::AwaitingProctors);
        assert_eq!(list.visible().len(), 1);
    }

    #[test]
    fn test_tab_counts() {
        let counts = sample().tab_counts();
        assert_eq!(
            counts,
            vec![
                (ExamTab::All, 6),
                (ExamTab::AwaitingProctors, 1),
                (ExamTab::CrossDepartment, 2),
                (ExamTab::Ready, 1),
                (ExamTab::Completed, 2),
            ]
        );
    }
}
