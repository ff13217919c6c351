use boforge::BusinessObject;
use chrono::NaiveDate;

use crate::model::user_bo::User;

#[derive(BusinessObject)]
pub struct Invoice {
    pub id: i64,
    #[bo(mandatory)]
    pub issued: NaiveDate,
    pub total: f64,
    #[bo(one_way)]
    pub customer: User,
}
