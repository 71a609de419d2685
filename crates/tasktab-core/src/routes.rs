//! Route targets of the pages that create and edit lists and tasks. Those
//! pages live elsewhere; the viewer only points at them.

pub const NEW_LIST: &str = "/list/new";
pub const NEW_TASK: &str = "/task/new";

#[must_use]
pub fn edit_list(list_id: u64) -> String {
    format!("/lists/{list_id}/edit")
}

#[must_use]
pub fn task_detail(list_id: u64, task_id: u64) -> String {
    format!("/lists/{list_id}/tasks/{task_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_identifiers() {
        assert_eq!(edit_list(4), "/lists/4/edit");
        assert_eq!(task_detail(4, 9), "/lists/4/tasks/9");
    }
}
