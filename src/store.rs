use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::grading;
use crate::policy::Role;

pub type UserId = u64;
pub type AssignmentId = u64;
pub type SubmissionId = u64;
pub type GradeId = u64;
pub type NotificationId = u64;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub parent_of: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: AssignmentId,
    pub teacher_id: UserId,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub max_score: f64,
    pub class_id: String,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub is_late: bool,
}

#[derive(Debug, Clone)]
pub struct Grade {
    pub id: GradeId,
    pub submission_id: SubmissionId,
    pub score: f64,
    pub comments: Option<String>,
    pub graded_by: UserId,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewUser {
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub struct NewAssignment {
    pub teacher_id: UserId,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub max_score: f64,
    pub class_id: String,
}

pub struct NewSubmission {
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

pub struct NewGrade {
    pub submission_id: SubmissionId,
    pub score: f64,
    pub comments: Option<String>,
    pub graded_by: UserId,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound {
        kind: &'static str,
        key: String,
    },
    EmailTaken {
        email: String,
    },
    RoleMismatch {
        expected: &'static str,
        user_id: UserId,
        found: &'static str,
    },
    NonPositiveMaxScore {
        max_score: f64,
    },
    ScoreOutOfRange {
        score: f64,
        max_score: f64,
    },
    DuplicateSubmission {
        assignment_id: AssignmentId,
        student_id: UserId,
    },
    AlreadyGraded {
        submission_id: SubmissionId,
    },
    Inconsistent {
        detail: String,
    },
}

/// Per-kind removal counts reported by a user delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub assignments: usize,
    pub submissions: usize,
    pub grades: usize,
    pub notifications: usize,
    pub parent_links: usize,
}

/// In-memory relational store. One arena per entity kind, keyed by a
/// per-kind monotonic id that is never reused; since ids only grow, map
/// key order is insertion order, and every ordered read below relies on
/// that.
#[derive(Default)]
pub struct Store {
    users: BTreeMap<UserId, User>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    submissions: BTreeMap<SubmissionId, Submission>,
    grades: BTreeMap<GradeId, Grade>,
    notifications: BTreeMap<NotificationId, Notification>,
    next_user_id: UserId,
    next_assignment_id: AssignmentId,
    next_submission_id: SubmissionId,
    next_grade_id: GradeId,
    next_notification_id: NotificationId,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    // ----- users -----

    pub fn create_user(&mut self, new: NewUser) -> Result<UserId, StoreError> {
        if self.user_by_email(&new.email).is_some() {
            return Err(StoreError::EmailTaken { email: new.email });
        }
        self.next_user_id += 1;
        let id = self.next_user_id;
        self.users.insert(
            id,
            User {
                id,
                role: new.role,
                full_name: new.full_name,
                email: new.email,
                password_hash: new.password_hash,
                password_salt: new.password_salt,
                phone: new.phone,
                address: new.address,
                parent_of: BTreeSet::new(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    pub fn user(&self, id: UserId) -> Result<&User, StoreError> {
        self.users.get(&id).ok_or(StoreError::NotFound {
            kind: "user",
            key: id.to_string(),
        })
    }

    /// Email lookup is case-insensitive; the stored spelling is preserved.
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn set_role(&mut self, id: UserId, role: Role) -> Result<(), StoreError> {
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound {
            kind: "user",
            key: id.to_string(),
        })?;
        user.role = role;
        Ok(())
    }

    /// Returns false when the pair was already linked.
    pub fn link_child(
        &mut self,
        parent_id: UserId,
        student_id: UserId,
    ) -> Result<bool, StoreError> {
        let student = self.user(student_id)?;
        if student.role != Role::Student {
            return Err(StoreError::RoleMismatch {
                expected: "student",
                user_id: student_id,
                found: student.role.as_str(),
            });
        }
        let parent = self.users.get_mut(&parent_id).ok_or(StoreError::NotFound {
            kind: "user",
            key: parent_id.to_string(),
        })?;
        if parent.role != Role::Parent {
            return Err(StoreError::RoleMismatch {
                expected: "parent",
                user_id: parent_id,
                found: parent.role.as_str(),
            });
        }
        Ok(parent.parent_of.insert(student_id))
    }

    /// Removes the user and everything that depends on it: their
    /// assignments, every submission under those assignments, their own
    /// submissions, grades on any removed submission, grades they issued,
    /// their notifications, and their id in any parent_of set. The full
    /// dependent closure is collected and verified before the first
    /// removal, so a failure leaves the store untouched.
    pub fn delete_user(&mut self, id: UserId) -> Result<CascadeSummary, StoreError> {
        if !self.users.contains_key(&id) {
            return Err(StoreError::NotFound {
                kind: "user",
                key: id.to_string(),
            });
        }

        let assignment_ids: BTreeSet<AssignmentId> = self
            .assignments
            .values()
            .filter(|a| a.teacher_id == id)
            .map(|a| a.id)
            .collect();

        let mut submission_ids: BTreeSet<SubmissionId> = BTreeSet::new();
        for s in self.submissions.values() {
            if s.student_id != id && !assignment_ids.contains(&s.assignment_id) {
                continue;
            }
            if !self.assignments.contains_key(&s.assignment_id) {
                return Err(StoreError::Inconsistent {
                    detail: format!(
                        "submission {} references missing assignment {}",
                        s.id, s.assignment_id
                    ),
                });
            }
            submission_ids.insert(s.id);
        }

        let mut grade_ids: BTreeSet<GradeId> = BTreeSet::new();
        for g in self.grades.values() {
            if g.graded_by != id && !submission_ids.contains(&g.submission_id) {
                continue;
            }
            if !self.submissions.contains_key(&g.submission_id) {
                return Err(StoreError::Inconsistent {
                    detail: format!(
                        "grade {} references missing submission {}",
                        g.id, g.submission_id
                    ),
                });
            }
            grade_ids.insert(g.id);
        }

        let notification_ids: Vec<NotificationId> = self
            .notifications
            .values()
            .filter(|n| n.recipient_id == id)
            .map(|n| n.id)
            .collect();

        let linked_parent_ids: Vec<UserId> = self
            .users
            .values()
            .filter(|u| u.parent_of.contains(&id))
            .map(|u| u.id)
            .collect();

        // Closure complete; apply.
        for aid in &assignment_ids {
            self.assignments.remove(aid);
        }
        for sid in &submission_ids {
            self.submissions.remove(sid);
        }
        for gid in &grade_ids {
            self.grades.remove(gid);
        }
        for nid in &notification_ids {
            self.notifications.remove(nid);
        }
        for pid in &linked_parent_ids {
            if let Some(parent) = self.users.get_mut(pid) {
                parent.parent_of.remove(&id);
            }
        }
        self.users.remove(&id);

        Ok(CascadeSummary {
            assignments: assignment_ids.len(),
            submissions: submission_ids.len(),
            grades: grade_ids.len(),
            notifications: notification_ids.len(),
            parent_links: linked_parent_ids.len(),
        })
    }

    // ----- assignments -----

    pub fn create_assignment(&mut self, new: NewAssignment) -> Result<AssignmentId, StoreError> {
        let teacher = self.user(new.teacher_id)?;
        if teacher.role != Role::Teacher {
            return Err(StoreError::RoleMismatch {
                expected: "teacher",
                user_id: new.teacher_id,
                found: teacher.role.as_str(),
            });
        }
        if !(new.max_score > 0.0) {
            return Err(StoreError::NonPositiveMaxScore {
                max_score: new.max_score,
            });
        }
        self.next_assignment_id += 1;
        let id = self.next_assignment_id;
        self.assignments.insert(
            id,
            Assignment {
                id,
                teacher_id: new.teacher_id,
                title: new.title,
                description: new.description,
                due_date: new.due_date,
                max_score: new.max_score,
                class_id: new.class_id,
            },
        );
        Ok(id)
    }

    pub fn assignment(&self, id: AssignmentId) -> Result<&Assignment, StoreError> {
        self.assignments.get(&id).ok_or(StoreError::NotFound {
            kind: "assignment",
            key: id.to_string(),
        })
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn assignments_by_teacher(&self, teacher_id: UserId) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .values()
            .filter(move |a| a.teacher_id == teacher_id)
    }

    pub fn assignments_in_class<'a>(
        &'a self,
        class_id: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> {
        self.assignments
            .values()
            .filter(move |a| a.class_id == class_id)
    }

    // ----- submissions -----

    pub fn create_submission(&mut self, new: NewSubmission) -> Result<SubmissionId, StoreError> {
        let assignment = self.assignment(new.assignment_id)?;
        let due_date = assignment.due_date;
        let student = self.user(new.student_id)?;
        if student.role != Role::Student {
            return Err(StoreError::RoleMismatch {
                expected: "student",
                user_id: new.student_id,
                found: student.role.as_str(),
            });
        }
        if self
            .submission_for(new.assignment_id, new.student_id)
            .is_some()
        {
            return Err(StoreError::DuplicateSubmission {
                assignment_id: new.assignment_id,
                student_id: new.student_id,
            });
        }
        self.next_submission_id += 1;
        let id = self.next_submission_id;
        self.submissions.insert(
            id,
            Submission {
                id,
                assignment_id: new.assignment_id,
                student_id: new.student_id,
                text: new.text,
                submitted_at: new.submitted_at,
                is_late: grading::is_late(new.submitted_at, due_date),
            },
        );
        Ok(id)
    }

    pub fn submission(&self, id: SubmissionId) -> Result<&Submission, StoreError> {
        self.submissions.get(&id).ok_or(StoreError::NotFound {
            kind: "submission",
            key: id.to_string(),
        })
    }

    pub fn submissions(&self) -> impl Iterator<Item = &Submission> {
        self.submissions.values()
    }

    pub fn submission_for(
        &self,
        assignment_id: AssignmentId,
        student_id: UserId,
    ) -> Option<&Submission> {
        self.submissions
            .values()
            .find(|s| s.assignment_id == assignment_id && s.student_id == student_id)
    }

    pub fn submissions_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> impl Iterator<Item = &Submission> {
        self.submissions
            .values()
            .filter(move |s| s.assignment_id == assignment_id)
    }

    pub fn submissions_by_student(&self, student_id: UserId) -> impl Iterator<Item = &Submission> {
        self.submissions
            .values()
            .filter(move |s| s.student_id == student_id)
    }

    // ----- grades -----

    pub fn create_grade(&mut self, new: NewGrade) -> Result<GradeId, StoreError> {
        let submission = self.submission(new.submission_id)?;
        let assignment_id = submission.assignment_id;
        let assignment =
            self.assignments
                .get(&assignment_id)
                .ok_or_else(|| StoreError::Inconsistent {
                    detail: format!(
                        "submission {} references missing assignment {}",
                        new.submission_id, assignment_id
                    ),
                })?;
        if !(new.score >= 0.0 && new.score <= assignment.max_score) {
            return Err(StoreError::ScoreOutOfRange {
                score: new.score,
                max_score: assignment.max_score,
            });
        }
        self.user(new.graded_by)?;
        if self.grade_for_submission(new.submission_id).is_some() {
            return Err(StoreError::AlreadyGraded {
                submission_id: new.submission_id,
            });
        }
        self.next_grade_id += 1;
        let id = self.next_grade_id;
        self.grades.insert(
            id,
            Grade {
                id,
                submission_id: new.submission_id,
                score: new.score,
                comments: new.comments,
                graded_by: new.graded_by,
                graded_at: new.graded_at,
            },
        );
        Ok(id)
    }

    pub fn grades(&self) -> impl Iterator<Item = &Grade> {
        self.grades.values()
    }

    pub fn grade_for_submission(&self, submission_id: SubmissionId) -> Option<&Grade> {
        self.grades
            .values()
            .find(|g| g.submission_id == submission_id)
    }

    // ----- notifications -----

    pub fn push_notification(
        &mut self,
        recipient_id: UserId,
        message: String,
    ) -> Result<NotificationId, StoreError> {
        self.user(recipient_id)?;
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notifications.insert(
            id,
            Notification {
                id,
                recipient_id,
                message,
                read: false,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.values()
    }

    pub fn notifications_for(&self, recipient_id: UserId) -> impl Iterator<Item = &Notification> {
        self.notifications
            .values()
            .filter(move |n| n.recipient_id == recipient_id)
    }

    pub fn unread_count(&self, recipient_id: UserId) -> usize {
        self.notifications_for(recipient_id)
            .filter(|n| !n.read)
            .count()
    }

    /// Marks one of the recipient's own notifications read. Ids belonging
    /// to other users are reported as missing, not as someone else's.
    pub fn mark_notification_read(
        &mut self,
        recipient_id: UserId,
        id: NotificationId,
    ) -> Result<(), StoreError> {
        match self.notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id => {
                n.read = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound {
                kind: "notification",
                key: id.to_string(),
            }),
        }
    }

    /// Marks all of the recipient's unread notifications read and returns
    /// how many changed.
    pub fn mark_all_read(&mut self, recipient_id: UserId) -> usize {
        let mut count = 0;
        for n in self.notifications.values_mut() {
            if n.recipient_id == recipient_id && !n.read {
                n.read = true;
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_user(role: Role, name: &str, email: &str) -> NewUser {
        NewUser {
            role,
            full_name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            password_salt: "salt".to_string(),
            phone: None,
            address: None,
        }
    }

    fn due(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn seed_class(store: &mut Store) -> (UserId, UserId, AssignmentId, SubmissionId, GradeId) {
        let teacher = store
            .create_user(new_user(Role::Teacher, "Tina Teach", "t@x.com"))
            .unwrap();
        let student = store
            .create_user(new_user(Role::Student, "Sam Study", "s@x.com"))
            .unwrap();
        let assignment = store
            .create_assignment(NewAssignment {
                teacher_id: teacher,
                title: "HW1".to_string(),
                description: "desc".to_string(),
                due_date: due(2024, 1, 1),
                max_score: 100.0,
                class_id: "class_1".to_string(),
            })
            .unwrap();
        let submission = store
            .create_submission(NewSubmission {
                assignment_id: assignment,
                student_id: student,
                text: "my work".to_string(),
                submitted_at: at(2023, 12, 31, 12),
            })
            .unwrap();
        let grade = store
            .create_grade(NewGrade {
                submission_id: submission,
                score: 95.0,
                comments: None,
                graded_by: teacher,
                graded_at: at(2024, 1, 2, 9),
            })
            .unwrap();
        (teacher, student, assignment, submission, grade)
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut store = Store::new();
        let a = store
            .create_user(new_user(Role::Admin, "A", "a@x.com"))
            .unwrap();
        let b = store
            .create_user(new_user(Role::Admin, "B", "b@x.com"))
            .unwrap();
        assert_eq!((a, b), (1, 2));
        store.delete_user(b).unwrap();
        let c = store
            .create_user(new_user(Role::Admin, "C", "c@x.com"))
            .unwrap();
        assert_eq!(c, 3);
        let ids: Vec<UserId> = store.users().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let mut store = Store::new();
        store
            .create_user(new_user(Role::Student, "A", "kid@x.com"))
            .unwrap();
        let err = store
            .create_user(new_user(Role::Parent, "B", "KID@X.COM"))
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken { .. }));
        assert_eq!(store.users().count(), 1);
        assert!(store.user_by_email("Kid@x.Com").is_some());
    }

    #[test]
    fn second_submission_for_same_pair_is_rejected() {
        let mut store = Store::new();
        let (_, student, assignment, _, _) = seed_class(&mut store);
        let err = store
            .create_submission(NewSubmission {
                assignment_id: assignment,
                student_id: student,
                text: "again".to_string(),
                submitted_at: at(2024, 1, 3, 8),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSubmission { .. }));
        assert_eq!(store.submissions().count(), 1);
    }

    #[test]
    fn submission_after_due_midnight_is_late() {
        let mut store = Store::new();
        let (_, _, assignment, _, _) = seed_class(&mut store);
        let other = store
            .create_user(new_user(Role::Student, "Late Kid", "late@x.com"))
            .unwrap();
        let id = store
            .create_submission(NewSubmission {
                assignment_id: assignment,
                student_id: other,
                text: "sorry".to_string(),
                submitted_at: at(2024, 1, 1, 9),
            })
            .unwrap();
        assert!(store.submission(id).unwrap().is_late);
    }

    #[test]
    fn score_bounds_and_double_grading_are_enforced() {
        let mut store = Store::new();
        let (teacher, _, assignment, submission, _) = seed_class(&mut store);
        let other = store
            .create_user(new_user(Role::Student, "Other", "o@x.com"))
            .unwrap();
        let second = store
            .create_submission(NewSubmission {
                assignment_id: assignment,
                student_id: other,
                text: "work".to_string(),
                submitted_at: at(2023, 12, 30, 8),
            })
            .unwrap();

        let over = store
            .create_grade(NewGrade {
                submission_id: second,
                score: 101.0,
                comments: None,
                graded_by: teacher,
                graded_at: at(2024, 1, 2, 9),
            })
            .unwrap_err();
        assert!(matches!(over, StoreError::ScoreOutOfRange { .. }));

        let negative = store
            .create_grade(NewGrade {
                submission_id: second,
                score: -1.0,
                comments: None,
                graded_by: teacher,
                graded_at: at(2024, 1, 2, 9),
            })
            .unwrap_err();
        assert!(matches!(negative, StoreError::ScoreOutOfRange { .. }));

        let again = store
            .create_grade(NewGrade {
                submission_id: submission,
                score: 50.0,
                comments: None,
                graded_by: teacher,
                graded_at: at(2024, 1, 2, 9),
            })
            .unwrap_err();
        assert!(matches!(again, StoreError::AlreadyGraded { .. }));
        assert_eq!(store.grades().count(), 1);
    }

    #[test]
    fn max_score_must_be_positive() {
        let mut store = Store::new();
        let teacher = store
            .create_user(new_user(Role::Teacher, "T", "t@x.com"))
            .unwrap();
        let err = store
            .create_assignment(NewAssignment {
                teacher_id: teacher,
                title: "Bad".to_string(),
                description: "".to_string(),
                due_date: due(2024, 1, 1),
                max_score: 0.0,
                class_id: "c".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NonPositiveMaxScore { .. }));
    }

    #[test]
    fn deleting_a_teacher_cascades_through_their_class() {
        let mut store = Store::new();
        let (teacher, student, assignment, submission, _) = seed_class(&mut store);
        store.push_notification(teacher, "hello".to_string()).unwrap();
        let parent = store
            .create_user(new_user(Role::Parent, "P", "p@x.com"))
            .unwrap();
        store.link_child(parent, student).unwrap();

        let summary = store.delete_user(teacher).unwrap();
        assert_eq!(summary.assignments, 1);
        assert_eq!(summary.submissions, 1);
        assert_eq!(summary.grades, 1);
        assert_eq!(summary.notifications, 1);
        assert_eq!(summary.parent_links, 0);

        assert!(matches!(
            store.assignment(assignment),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.submission(submission),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(store.grades().count(), 0);
        // The student and the parent link survive a teacher delete.
        assert!(store.user(student).is_ok());
        assert!(store.user(parent).unwrap().parent_of.contains(&student));
    }

    #[test]
    fn deleting_a_student_strips_parent_links_and_their_work() {
        let mut store = Store::new();
        let (teacher, student, assignment, _, _) = seed_class(&mut store);
        let parent = store
            .create_user(new_user(Role::Parent, "P", "p@x.com"))
            .unwrap();
        store.link_child(parent, student).unwrap();
        store
            .push_notification(student, "graded".to_string())
            .unwrap();

        let summary = store.delete_user(student).unwrap();
        assert_eq!(summary.assignments, 0);
        assert_eq!(summary.submissions, 1);
        assert_eq!(summary.grades, 1);
        assert_eq!(summary.notifications, 1);
        assert_eq!(summary.parent_links, 1);

        assert!(store.assignment(assignment).is_ok());
        assert!(store.user(parent).unwrap().parent_of.is_empty());
        assert_eq!(store.submissions_by_student(student).count(), 0);
        assert!(store.user(teacher).is_ok());
    }

    #[test]
    fn link_child_checks_roles_and_deduplicates() {
        let mut store = Store::new();
        let parent = store
            .create_user(new_user(Role::Parent, "P", "p@x.com"))
            .unwrap();
        let student = store
            .create_user(new_user(Role::Student, "S", "s@x.com"))
            .unwrap();
        let teacher = store
            .create_user(new_user(Role::Teacher, "T", "t@x.com"))
            .unwrap();

        assert!(store.link_child(parent, student).unwrap());
        assert!(!store.link_child(parent, student).unwrap());
        assert!(matches!(
            store.link_child(teacher, student),
            Err(StoreError::RoleMismatch { .. })
        ));
        assert!(matches!(
            store.link_child(parent, teacher),
            Err(StoreError::RoleMismatch { .. })
        ));
    }

    #[test]
    fn notification_reads_are_scoped_to_the_recipient() {
        let mut store = Store::new();
        let a = store
            .create_user(new_user(Role::Student, "A", "a@x.com"))
            .unwrap();
        let b = store
            .create_user(new_user(Role::Student, "B", "b@x.com"))
            .unwrap();
        let n1 = store.push_notification(a, "one".to_string()).unwrap();
        store.push_notification(a, "two".to_string()).unwrap();
        let n3 = store.push_notification(b, "three".to_string()).unwrap();

        assert_eq!(store.unread_count(a), 2);
        assert!(matches!(
            store.mark_notification_read(a, n3),
            Err(StoreError::NotFound { .. })
        ));
        store.mark_notification_read(a, n1).unwrap();
        assert_eq!(store.unread_count(a), 1);
        assert_eq!(store.mark_all_read(a), 1);
        assert_eq!(store.mark_all_read(a), 0);
        assert_eq!(store.unread_count(b), 1);
    }
}
