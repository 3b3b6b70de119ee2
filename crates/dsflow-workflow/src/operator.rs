//! `>>` and `<<` as shorthand for [`Task::precedes`] and [`Task::follows`].
//!
//! `&a >> &b` makes `b` depend on `a` and evaluates to `&b`, so chains read
//! left to right: `&a >> &b >> &c`. Arrays and vectors of task references
//! broadcast on either side: `&a >> [&b, &c]` and `[&a, &b] >> &c` link
//! every element individually. `<<` is the mirror image.

use std::ops::{Shl, Shr};

use crate::task::Task;

impl<'a> Shr<&'a Task> for &Task {
    type Output = &'a Task;

    fn shr(self, rhs: &'a Task) -> Self::Output {
        self.precedes(rhs)
    }
}

impl<'a> Shl<&'a Task> for &Task {
    type Output = &'a Task;

    fn shl(self, rhs: &'a Task) -> Self::Output {
        self.follows(rhs)
    }
}

impl<'a, const N: usize> Shr<[&'a Task; N]> for &Task {
    type Output = [&'a Task; N];

    fn shr(self, rhs: [&'a Task; N]) -> Self::Output {
        self.precedes(rhs)
    }
}

impl<'a, const N: usize> Shl<[&'a Task; N]> for &Task {
    type Output = [&'a Task; N];

    fn shl(self, rhs: [&'a Task; N]) -> Self::Output {
        self.follows(rhs)
    }
}

impl<'a> Shr<Vec<&'a Task>> for &Task {
    type Output = Vec<&'a Task>;

    fn shr(self, rhs: Vec<&'a Task>) -> Self::Output {
        self.precedes(rhs)
    }
}

impl<'a> Shl<Vec<&'a Task>> for &Task {
    type Output = Vec<&'a Task>;

    fn shl(self, rhs: Vec<&'a Task>) -> Self::Output {
        self.follows(rhs)
    }
}

impl<'a, const N: usize> Shr<&'a Task> for [&Task; N] {
    type Output = &'a Task;

    fn shr(self, rhs: &'a Task) -> Self::Output {
        rhs.follows(self);
        rhs
    }
}

impl<'a, const N: usize> Shl<&'a Task> for [&Task; N] {
    type Output = &'a Task;

    fn shl(self, rhs: &'a Task) -> Self::Output {
        rhs.precedes(self);
        rhs
    }
}

impl<'a> Shr<&'a Task> for Vec<&Task> {
    type Output = &'a Task;

    fn shr(self, rhs: &'a Task) -> Self::Output {
        rhs.follows(self);
        rhs
    }
}

impl<'a> Shl<&'a Task> for Vec<&Task> {
    type Output = &'a Task;

    fn shl(self, rhs: &'a Task) -> Self::Output {
        rhs.precedes(self);
        rhs
    }
}
