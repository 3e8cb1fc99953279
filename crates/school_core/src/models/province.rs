//! Provincial-level regions accepted in the `province` column.

pub const PROVINCES: [&str; 34] = [
    "安徽", "北京", "福建", "甘肃", "广东", "广西", "贵州", "海南", "河北", "河南", "黑龙江",
    "湖北", "湖南", "吉林", "江苏", "江西", "辽宁", "内蒙古", "山东", "山西", "陕西", "上海",
    "四川", "天津", "新疆", "浙江", "重庆", "宁夏", "云南", "澳门", "香港", "青海", "西藏",
    "台湾",
];

pub fn is_known_province(province: &str) -> bool {
    PROVINCES.contains(&province)
}
