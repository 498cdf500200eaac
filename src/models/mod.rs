// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendees;
pub mod comment;
pub mod event;
pub mod lifecycle;
pub mod link;
pub mod markers;
pub mod poll;
pub mod retention;
pub mod todo;
pub mod user;

pub use attendees::{Attendees, JoinRequest, RequestStatus, Requests};
pub use comment::{Comment, Comments};
pub use event::{EventRecord, Location, NewEvent};
pub use lifecycle::{EventStatus, Lifecycle, Transition};
pub use link::{Link, Links};
pub use markers::{PathMarker, PathMarkers};
pub use poll::{NewPoll, Poll, Polls, Priority};
pub use retention::{RetentionStage, RetentionState};
pub use todo::{Task, TodoList};
pub use user::{Availability, AvailabilityStatus, NewUser, Role, User};
