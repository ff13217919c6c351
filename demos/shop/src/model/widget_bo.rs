use boforge::BusinessObject;

use super::user_bo::User;

#[derive(BusinessObject)]
#[bo(table = "widgets")]
pub struct Widget {
    pub id: i64,
    #[bo(mandatory, size(1, 64))]
    pub name: String,
    #[bo(min = 0, max = 100, default = 1)]
    pub count: i32,
    #[bo(child_to_parent = "widgets", mandatory)]
    pub owner: User,
}
