use boforge::BusinessObject;

#[derive(BusinessObject)]
#[bo(query_params)]
pub struct WidgetSearch {
    pub q: Option<String>,
    #[bo(min = 1)]
    pub page: Option<i32>,
}
