use boforge::BusinessObject;

use super::widget_bo::Widget;

#[derive(BusinessObject)]
#[bo(table = "users")]
pub struct User {
    pub id: i64,
    #[bo(mandatory, size(3, 254))]
    pub email: String,
    #[bo(only("member", "admin"), default = "member")]
    pub role: String,
    pub widgets: Vec<Widget>,
}
